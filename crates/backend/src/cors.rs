//! Cross-origin policy middleware.

use axum::{
    Router,
    extract::Request,
    http::{HeaderName, HeaderValue, Method, header},
    middleware::{self, Next},
    response::Response,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::config::{CorsConfig, Headers, Methods, Origins};

/// Methods granted when the policy allows any method.
const STANDARD_METHODS: [Method; 7] = [
    Method::DELETE,
    Method::GET,
    Method::HEAD,
    Method::OPTIONS,
    Method::PATCH,
    Method::POST,
    Method::PUT,
];

/// CORS-safelisted request headers, always granted alongside an explicit list.
const SAFELISTED_HEADERS: [HeaderName; 4] = [
    header::ACCEPT,
    header::ACCEPT_LANGUAGE,
    header::CONTENT_LANGUAGE,
    header::CONTENT_TYPE,
];

/// Installs the cross-origin policy on every route of `router`, including
/// the not-found fallback.
///
/// With "any origin" and credentials enabled, the response carries
/// `Access-Control-Allow-Origin: *` unless the request sends cookies, in
/// which case the request origin is echoed back.
pub fn apply<S>(router: Router<S>, config: &CorsConfig) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    tracing::info!(
        origins = ?config.allow_origins,
        credentials = config.allow_credentials,
        methods = ?config.allow_methods,
        headers = ?config.allow_headers,
        max_age_secs = config.max_age.as_secs(),
        "installing CORS policy"
    );

    let router = router.layer(layer(config));

    if matches!(config.allow_origins, Origins::Any) && config.allow_credentials {
        router.layer(middleware::from_fn(wildcard_origin))
    } else {
        router
    }
}

/// Builds the tower-http layer for `config`.
///
/// tower-http refuses wildcards together with credentials, so when
/// credentials are allowed "any origin" and "any header" mirror the request
/// and "any method" becomes the explicit list of standard methods.
pub fn layer(config: &CorsConfig) -> CorsLayer {
    let allow_origin = match &config.allow_origins {
        Origins::Any if config.allow_credentials => AllowOrigin::mirror_request(),
        Origins::Any => AllowOrigin::any(),
        Origins::List(origins) => AllowOrigin::list(origins.iter().cloned()),
    };

    let allow_methods = match &config.allow_methods {
        Methods::Any => AllowMethods::list(STANDARD_METHODS),
        Methods::List(methods) => AllowMethods::list(methods.iter().cloned()),
    };

    let allow_headers = match &config.allow_headers {
        Headers::Any if config.allow_credentials => AllowHeaders::mirror_request(),
        Headers::Any => AllowHeaders::any(),
        Headers::List(headers) => AllowHeaders::list(with_safelisted(headers)),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(allow_methods)
        .allow_headers(allow_headers)
        .allow_credentials(config.allow_credentials)
        .max_age(config.max_age)
}

fn with_safelisted(headers: &[HeaderName]) -> Vec<HeaderName> {
    let mut all = SAFELISTED_HEADERS.to_vec();
    for name in headers {
        if !all.contains(name) {
            all.push(name.clone());
        }
    }
    all
}

/// Replaces the mirrored origin with `*` for requests that carry no cookies.
async fn wildcard_origin(request: Request, next: Next) -> Response {
    let credentialed = request.headers().contains_key(header::COOKIE);
    let mut response = next.run(request).await;

    if credentialed {
        return response;
    }
    if let Some(origin) = response
        .headers_mut()
        .get_mut(header::ACCESS_CONTROL_ALLOW_ORIGIN)
    {
        *origin = HeaderValue::from_static("*");
    }
    response
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use tower::ServiceExt;

    use super::*;

    fn app(config: &CorsConfig) -> Router {
        apply(Router::new().route("/", get(|| async { "ok" })), config)
    }

    fn header_str<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
        response
            .headers()
            .get(name)
            .map(|value| value.to_str().unwrap())
    }

    fn preflight(origin: &str) -> axum::http::request::Builder {
        Request::builder()
            .method("OPTIONS")
            .uri("/")
            .header("Origin", origin)
            .header("Access-Control-Request-Method", "PUT")
    }

    #[tokio::test]
    async fn permissive_policy_answers_with_wildcard_origin() {
        let request = Request::builder()
            .uri("/")
            .header("Origin", "https://random-origin.com")
            .body(Body::empty())
            .unwrap();

        let response = app(&CorsConfig::permissive())
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, "access-control-allow-origin"), Some("*"));
        assert_eq!(
            header_str(&response, "access-control-allow-credentials"),
            Some("true")
        );
    }

    #[tokio::test]
    async fn permissive_policy_echoes_origin_for_cookie_requests() {
        let request = Request::builder()
            .uri("/")
            .header("Origin", "https://example.com")
            .header("Cookie", "session=abc")
            .body(Body::empty())
            .unwrap();

        let response = app(&CorsConfig::permissive())
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(
            header_str(&response, "access-control-allow-origin"),
            Some("https://example.com")
        );
        assert_eq!(
            header_str(&response, "access-control-allow-credentials"),
            Some("true")
        );
    }

    #[tokio::test]
    async fn request_without_origin_gets_no_allow_origin() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = app(&CorsConfig::permissive())
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            !response
                .headers()
                .contains_key("access-control-allow-origin")
        );
    }

    #[tokio::test]
    async fn permissive_preflight_grants_standard_methods_and_requested_headers() {
        let request = preflight("https://example.com")
            .header("Access-Control-Request-Headers", "x-custom, authorization")
            .body(Body::empty())
            .unwrap();

        let response = app(&CorsConfig::permissive())
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, "access-control-allow-origin"), Some("*"));
        assert_eq!(
            header_str(&response, "access-control-allow-headers"),
            Some("x-custom, authorization")
        );
        assert_eq!(header_str(&response, "access-control-max-age"), Some("600"));

        let methods: Vec<&str> = header_str(&response, "access-control-allow-methods")
            .unwrap()
            .split(',')
            .map(str::trim)
            .collect();
        for method in ["DELETE", "GET", "HEAD", "OPTIONS", "PATCH", "POST", "PUT"] {
            assert!(methods.contains(&method), "missing {method} in {methods:?}");
        }
    }

    #[tokio::test]
    async fn explicit_origin_is_echoed() {
        let config = CorsConfig {
            allow_origins: Origins::List(vec![HeaderValue::from_static("https://example.com")]),
            ..CorsConfig::permissive()
        };
        let request = Request::builder()
            .uri("/")
            .header("Origin", "https://example.com")
            .body(Body::empty())
            .unwrap();

        let response = app(&config).oneshot(request).await.unwrap();

        assert_eq!(
            header_str(&response, "access-control-allow-origin"),
            Some("https://example.com")
        );
    }

    #[tokio::test]
    async fn explicit_origin_is_echoed_on_preflight() {
        let config = CorsConfig {
            allow_origins: Origins::List(vec![HeaderValue::from_static("https://example.com")]),
            ..CorsConfig::permissive()
        };
        let request = preflight("https://example.com")
            .body(Body::empty())
            .unwrap();

        let response = app(&config).oneshot(request).await.unwrap();

        assert_eq!(
            header_str(&response, "access-control-allow-origin"),
            Some("https://example.com")
        );
        assert_eq!(
            header_str(&response, "access-control-allow-credentials"),
            Some("true")
        );
    }

    #[tokio::test]
    async fn unlisted_origin_gets_no_allow_origin() {
        let config = CorsConfig {
            allow_origins: Origins::List(vec![HeaderValue::from_static("https://example.com")]),
            ..CorsConfig::permissive()
        };
        let request = Request::builder()
            .uri("/")
            .header("Origin", "https://evil.example")
            .body(Body::empty())
            .unwrap();

        let response = app(&config).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            !response
                .headers()
                .contains_key("access-control-allow-origin")
        );
    }

    #[tokio::test]
    async fn without_credentials_uses_plain_wildcards() {
        let config = CorsConfig {
            allow_credentials: false,
            ..CorsConfig::permissive()
        };
        let request = preflight("https://example.com")
            .header("Access-Control-Request-Headers", "x-custom")
            .body(Body::empty())
            .unwrap();

        let response = app(&config).oneshot(request).await.unwrap();

        assert_eq!(header_str(&response, "access-control-allow-origin"), Some("*"));
        assert_eq!(header_str(&response, "access-control-allow-headers"), Some("*"));
        assert!(
            !response
                .headers()
                .contains_key("access-control-allow-credentials")
        );
    }

    #[tokio::test]
    async fn explicit_lists_are_honored() {
        let config = CorsConfig {
            allow_methods: Methods::List(vec![Method::GET]),
            allow_headers: Headers::List(vec![HeaderName::from_static("x-request-id")]),
            max_age: Duration::from_secs(30),
            ..CorsConfig::permissive()
        };
        let request = preflight("https://example.com")
            .body(Body::empty())
            .unwrap();

        let response = app(&config).oneshot(request).await.unwrap();

        assert_eq!(header_str(&response, "access-control-allow-methods"), Some("GET"));
        assert_eq!(header_str(&response, "access-control-max-age"), Some("30"));

        let headers: Vec<&str> = header_str(&response, "access-control-allow-headers")
            .unwrap()
            .split(',')
            .map(str::trim)
            .collect();
        for name in ["accept", "content-type", "x-request-id"] {
            assert!(headers.contains(&name), "missing {name} in {headers:?}");
        }
    }

    #[test]
    fn safelisted_headers_are_not_duplicated() {
        let all = with_safelisted(&[header::CONTENT_TYPE, HeaderName::from_static("x-trace")]);
        assert_eq!(all.len(), 5);
        assert_eq!(all.last(), Some(&HeaderName::from_static("x-trace")));
    }
}

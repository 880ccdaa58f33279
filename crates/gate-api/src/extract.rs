//! Request extraction helpers.

use axum::extract::{FromRequest, Request};
use axum::http::HeaderMap;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Headers checked for the originating client IP, in priority order.
const IP_HEADERS: [&str; 3] = ["x-forwarded-for", "x-real-ip", "cf-connecting-ip"];

/// Best-effort client IP from proxy headers.
///
/// `x-forwarded-for` may carry a chain; only the first hop counts.
/// Falls back to loopback when nothing usable is present, which keeps
/// direct local connections working.
pub fn client_ip(headers: &HeaderMap) -> String {
    for name in IP_HEADERS {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            let first = value.split(',').next().unwrap_or("").trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    "127.0.0.1".to_string()
}

/// JSON body extractor whose rejection renders the standard error
/// body instead of axum's plain-text default, so malformed JSON goes
/// out as a `validation_error` like every other bad input.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::validation(serde_json::json!({
                "body": rejection.body_text(),
            }))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers), "203.0.113.7");
    }

    #[test]
    fn test_header_priority_order() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("198.51.100.2"));
        headers.insert("x-real-ip", HeaderValue::from_static("192.0.2.1"));
        assert_eq!(client_ip(&headers), "192.0.2.1");
    }

    #[test]
    fn test_falls_back_to_loopback() {
        assert_eq!(client_ip(&HeaderMap::new()), "127.0.0.1");
    }
}

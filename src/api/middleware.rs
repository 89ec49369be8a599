/// Request plumbing shared by every route
use crate::{error::BoardError, metrics};
use axum::{
    async_trait,
    extract::{FromRequest, MatchedPath, Request},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
    Json,
};
use serde::de::DeserializeOwned;
use std::time::Instant;

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// JSON body that may be left out entirely
///
/// Only a request without a body yields `None`. A body that is present but
/// malformed is rejected like any other JSON payload.
pub struct OptionalJson<T>(pub Option<T>);

impl<T: Default> OptionalJson<T> {
    pub fn or_default(self) -> T {
        self.0.unwrap_or_default()
    }
}

#[async_trait]
impl<T, S> FromRequest<S> for OptionalJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = BoardError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !has_body(req.headers()) {
            return Ok(OptionalJson(None));
        }
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| BoardError::Validation(rejection.body_text()))?;
        Ok(OptionalJson(Some(value)))
    }
}

fn has_body(headers: &HeaderMap) -> bool {
    let declared_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    match declared_length {
        Some(length) => length > 0,
        None => headers.contains_key(header::CONTENT_TYPE)
            || headers.contains_key(header::TRANSFER_ENCODING),
    }
}

/// Count and time every request by its route template
///
/// Unmatched paths are folded into one label so scanners cannot blow up
/// the metric cardinality.
pub async fn track_http_metrics(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    metrics::record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::HeaderValue};
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(deny_unknown_fields)]
    struct Note {
        note: Option<String>,
    }

    async fn extract(content_type: Option<&str>, body: &'static str) -> Result<Option<Note>, BoardError> {
        let mut builder = Request::builder().method("POST").uri("/");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let request = builder.body(Body::from(body)).unwrap();
        OptionalJson::<Note>::from_request(request, &())
            .await
            .map(|OptionalJson(value)| value)
    }

    #[tokio::test]
    async fn test_optional_json_only_skips_missing_body() {
        assert_eq!(extract(None, "").await.unwrap(), None);
        assert_eq!(
            extract(Some("application/json"), r#"{"note":"ok"}"#).await.unwrap(),
            Some(Note {
                note: Some("ok".into())
            })
        );

        assert!(matches!(
            extract(Some("application/json"), r#"{"note": 5}"#).await,
            Err(BoardError::Validation(_))
        ));
        assert!(matches!(
            extract(Some("application/json"), r#"{"nite":"typo"}"#).await,
            Err(BoardError::Validation(_))
        ));
        assert!(matches!(
            extract(Some("text/plain"), "note").await,
            Err(BoardError::Validation(_))
        ));
    }

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("abc.def"));

        headers.insert("authorization", HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);
    }
}

use axum::{
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BearerRejection {
    Missing,
    Malformed,
    WrongScheme,
    Mismatch,
}

impl BearerRejection {
    fn message(&self) -> &'static str {
        match self {
            Self::Missing => "Missing Authorization header",
            Self::Malformed => "Invalid Authorization header",
            Self::WrongScheme => "Authorization must use Bearer token",
            Self::Mismatch => "Invalid API key",
        }
    }
}

impl IntoResponse for BearerRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "jsonrpc": "2.0",
                "id": null,
                "error": {
                    "code": -32001,
                    "message": self.message(),
                }
            })),
        )
            .into_response()
    }
}

pub fn verify_bearer(headers: &HeaderMap, expected_key: &str) -> Result<(), BearerRejection> {
    let token = extract_bearer_token(headers)?;
    if !constant_time_eq(token.trim().as_bytes(), expected_key.as_bytes()) {
        return Err(BearerRejection::Mismatch);
    }
    Ok(())
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, BearerRejection> {
    let raw = headers
        .get(AUTHORIZATION)
        .ok_or(BearerRejection::Missing)?;
    let value = raw.to_str().map_err(|_| BearerRejection::Malformed)?;
    value
        .strip_prefix("Bearer ")
        .ok_or(BearerRejection::WrongScheme)
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn accepts_matching_bearer_token() {
        assert_eq!(verify_bearer(&headers("Bearer local-token"), "local-token"), Ok(()));
        assert_eq!(verify_bearer(&headers("Bearer local-token "), "local-token"), Ok(()));
    }

    #[test]
    fn rejects_each_failure_mode() {
        assert_eq!(
            verify_bearer(&HeaderMap::new(), "local-token"),
            Err(BearerRejection::Missing)
        );
        assert_eq!(
            verify_bearer(&headers("Basic a2V5OnNlY3JldA=="), "local-token"),
            Err(BearerRejection::WrongScheme)
        );
        assert_eq!(
            verify_bearer(&headers("Bearer other"), "local-token"),
            Err(BearerRejection::Mismatch)
        );
    }

    #[test]
    fn rejection_is_unauthorized() {
        let response = BearerRejection::Mismatch.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

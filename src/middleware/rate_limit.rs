use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

use slate_core::AppError;

/// Rewrites the limiter's plain-text 429 into the standard error envelope,
/// keeping its `retry-after` and `x-ratelimit-*` headers.
pub async fn rate_limit_envelope(response: Response) -> Response {
    if response.status() != StatusCode::TOO_MANY_REQUESTS {
        return response;
    }

    let (parts, _) = response.into_parts();
    let mut enveloped = AppError::rate_limited("Too many requests, retry later").into_response();
    for (name, value) in &parts.headers {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            enveloped.headers_mut().insert(name.clone(), value.clone());
        }
    }
    enveloped
}

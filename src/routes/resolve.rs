//! Location path resolution route

use bytes::Bytes;
use http_body_util::Full;
use hyper::Response;
use std::sync::Arc;
use tracing::error;

use crate::server::http::{error_response, json_response, text_response};
use crate::server::AppState;
use crate::services::Resolved;
use crate::types::ResolverError;

/// Handle `GET /<location path>`
///
/// Resolution runs on its own task so a panic inside it still answers 500.
pub async fn handle_resolve(state: Arc<AppState>, path: &str) -> Response<Full<Bytes>> {
    let location = location_from_path(path);

    let task = tokio::spawn(async move { state.resolver.resolve(&location).await });
    let outcome = match task.await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Resolution task aborted: {}", e);
            Err(ResolverError::Internal(e.to_string()))
        }
    };

    match outcome {
        Ok(Resolved::Json(value)) => json_response(&value),
        Ok(Resolved::Text { body, content_type }) => text_response(body, content_type.as_deref()),
        Err(e) => error_response(&e),
    }
}

/// Leading `/` removed, `%XX` escapes decoded
///
/// Invalid UTF-8 after decoding is replaced with U+FFFD.
pub fn location_from_path(path: &str) -> String {
    let raw = path.strip_prefix('/').unwrap_or(path);
    String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned()
}

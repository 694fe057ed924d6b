use crate::api::error::AppError;
use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::any::Any;

/// Give axum's bare 405 responses the same JSON body as every other error.
pub async fn json_method_not_allowed(req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    if response.status() != StatusCode::METHOD_NOT_ALLOWED {
        return response;
    }

    let (parts, _) = response.into_parts();
    let mut json = AppError::MethodNotAllowed.into_response();
    if let Some(allow) = parts.headers.get(axum::http::header::ALLOW) {
        json.headers_mut()
            .insert(axum::http::header::ALLOW, allow.clone());
    }
    json
}

/// Response for a panic caught at the HTTP boundary. No detail leaks to the client.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    tracing::error!(panic = %detail, "recovered panic while serving request");
    AppError::Internal("handler panicked".to_string()).into_response()
}

use crate::api::error::AppError;
use crate::models::IndexResponse;
use crate::API_BASE_PATH;
use axum::{
    Json,
    http::{StatusCode, header},
    response::IntoResponse,
};

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Pointer to the current API base path", body = IndexResponse)
    ),
    tag = "system"
)]
pub async fn index() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::LOCATION, API_BASE_PATH)],
        Json(IndexResponse {
            code: 200,
            message: "index".to_string(),
            current: API_BASE_PATH.to_string(),
        }),
    )
}

pub async fn not_found() -> AppError {
    AppError::NotFound
}

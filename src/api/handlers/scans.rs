use crate::AppState;
use crate::api::error::AppError;
use crate::models::{ApiMessage, OBJECT_TYPE_FILE, ScanRequest};
use crate::services::dispatcher::{DispatchError, InFlightScan};
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
};

/// Scan an object asynchronously.
///
/// The request is validated and handed to the dispatcher; the pipeline keeps
/// running after the 202 is sent. Later failures only show up in logs and on
/// the webhook.
#[utoipa::path(
    post,
    path = "/v1/scanObject.async",
    request_body = ScanRequest,
    responses(
        (status = 202, description = "Accepted, processing asynchronously", body = ApiMessage),
        (status = 400, description = "Wrong content type, bad JSON or unsupported object", body = ApiMessage),
        (status = 503, description = "Too many scans in flight", body = ApiMessage)
    ),
    tag = "scans"
)]
pub async fn scan_object_async(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiMessage>), AppError> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with(mime::APPLICATION_JSON.as_ref()));
    if !is_json {
        return Err(AppError::BadRequest("Content-Type not JSON"));
    }

    let request: ScanRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(error = %e, "rejecting unparsable scan request");
        AppError::BadRequest("could not parse JSON body")
    })?;

    if request.object_type != OBJECT_TYPE_FILE {
        return Err(AppError::BadRequest("invalid object type"));
    }

    if request
        .backend_file_id
        .as_deref()
        .is_none_or(|fid| fid.trim().is_empty())
    {
        return Err(AppError::BadRequest("missing backend file id"));
    }

    let bucket_key = request.bucket_key.clone();
    let scan = state.dispatcher.dispatch(request).map_err(|e| match e {
        DispatchError::AtCapacity(_) => AppError::Overloaded(e.to_string()),
    })?;

    tracing::info!(scan_id = %scan.id, bucket_key = %bucket_key, "📥 Scan accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiMessage::new(
            StatusCode::ACCEPTED.as_u16(),
            "Accepted (processing asynchronously)",
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/v1/scans",
    responses(
        (status = 200, description = "Scans currently in flight", body = [InFlightScan])
    ),
    tag = "scans"
)]
pub async fn list_in_flight(State(state): State<AppState>) -> Json<Vec<InFlightScan>> {
    Json(state.dispatcher.in_flight())
}

use axum::{Json, extract::State};

use crate::{
    AppState,
    extract::ApiJson,
    auth::AuthDealer,
    error::{AppError, AppResult},
    models::{PresignedUrlRequest, PresignedUrlResponse},
    storage::{MediaKind, media_key},
};

/// get_presigned_upload_url
///
/// [Dealer Route] Media pipeline: the browser PUTs the file straight to storage with
/// the returned URL, then references `resource_key` when creating the listing.
/// The object key is generated server-side under the dealer's own folder.
#[utoipa::path(
    post,
    path = "/api/dealer/uploads",
    request_body = PresignedUrlRequest,
    responses(
        (status = 200, description = "Upload URL issued", body = PresignedUrlResponse),
        (status = 400, description = "Unsupported media type"),
        (status = 500, description = "Storage unavailable")
    )
)]
pub async fn get_presigned_upload_url(
    AuthDealer { dealer, .. }: AuthDealer,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<PresignedUrlRequest>,
) -> AppResult<Json<PresignedUrlResponse>> {
    let (kind, extension) = MediaKind::from_content_type(&payload.file_type).ok_or_else(|| {
        AppError::validation("Unsupported file type. Allowed: JPEG, PNG, WebP images and MP4, MOV, WebM videos")
    })?;

    let resource_key = media_key(kind, dealer.id, extension);
    let upload_url = state
        .storage
        .get_presigned_upload_url(&resource_key, payload.file_type.trim())
        .await
        .map_err(|e| AppError::internal(format!("presign failed: {e}")))?;

    tracing::debug!(dealer_id = %dealer.id, key = %resource_key, filename = %payload.filename, "issued upload url");
    Ok(Json(PresignedUrlResponse {
        upload_url,
        resource_key,
    }))
}

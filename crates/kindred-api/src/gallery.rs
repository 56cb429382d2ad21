use axum::{
    Extension, Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use kindred_auth::Claims;
use kindred_types::api::{GalleryResponse, UploadResponse};
use kindred_types::models::Photo;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::paired_caller;

/// 50 MB upload limit for images
pub const MAX_IMAGE_SIZE: usize = 50 * 1024 * 1024;

pub async fn list_photos(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<GalleryResponse>> {
    let (_, code) = paired_caller(&state, &claims).await?;
    let gallery = state.db_call(move |db| db.list_photos(&code)).await?;
    Ok(Json(GalleryResponse { gallery }))
}

/// POST /gallery: multipart form with an `image` file and a `caption`.
pub async fn upload_photo(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let (account, code) = paired_caller(&state, &claims).await?;

    let mut image: Option<(String, Vec<u8>)> = None;
    let mut caption: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read image: {e}")))?;
                if data.len() > MAX_IMAGE_SIZE {
                    return Err(ApiError::PayloadTooLarge {
                        size: data.len(),
                        max: MAX_IMAGE_SIZE,
                    });
                }
                image = Some((file_name, data.to_vec()));
            }
            Some("caption") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read caption: {e}")))?;
                caption = Some(text.trim().to_string()).filter(|c| !c.is_empty());
            }
            _ => {}
        }
    }

    let (Some((file_name, data)), Some(caption)) = (image, caption) else {
        return Err(ApiError::bad_request("Image and caption are required"));
    };
    if data.is_empty() {
        return Err(ApiError::bad_request("Image is empty"));
    }

    let url = state.blobs.put(&file_name, &data).await.map_err(|e| {
        error!("Failed to store upload {}: {}", file_name, e);
        ApiError::Internal(e.to_string())
    })?;

    let photo = Photo {
        id: Uuid::new_v4(),
        url: url.clone(),
        caption,
        uploaded_by: account.name,
        uploaded_at: Utc::now(),
    };
    state
        .db_call(move |db| db.insert_photo(&code, &photo))
        .await?;

    info!("{} uploaded {} ({} bytes)", account.email, url, data.len());
    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "Image uploaded successfully".into(),
            url,
        }),
    ))
}

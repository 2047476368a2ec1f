//! Directory API endpoints
//!
//! Folder listings go through the short-TTL cache; uploads and deletes go
//! straight to the collaborator and invalidate the affected folder.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::directory::{DirectoryListing, FileEntry, UploadRequest};
use crate::error::AppError;
use crate::session::ViewState;
use crate::state::AppState;

/// Query of `DELETE /files/:id`
#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    /// Folder the file was listed in; all folders are invalidated when absent
    pub directory: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/directories/:slug", get(get_listing))
        .route("/directories/:slug/refresh", post(refresh_listing))
        .route("/directories/:slug/files", post(upload_file))
        .route("/directories/:slug/files/:id/open", post(open_file))
        .route("/files/:id", delete(delete_file))
        // Drawings and scanned plans can be large
        .layer(DefaultBodyLimit::max(256 * 1024 * 1024))
}

async fn get_listing(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<DirectoryListing>, AppError> {
    let listing = state.directory().get_listing(&slug).await?;
    Ok(Json(listing.as_ref().clone()))
}

async fn refresh_listing(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<DirectoryListing>, AppError> {
    state.directory().invalidate(&slug);
    let listing = state.directory().get_listing(&slug).await?;
    Ok(Json(listing.as_ref().clone()))
}

/// Multipart upload: `file` (required) and `description`
async fn upload_file(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<FileEntry>), AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut description = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "upload.pdf".to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file data: {}", e)))?;
                tracing::debug!(file = %file_name, bytes = data.len(), "Received upload");
                file = Some((file_name, data.to_vec()));
            }
            "description" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read description: {}", e)))?;
                description = Some(text).filter(|t| !t.trim().is_empty());
            }
            other => tracing::debug!(field = %other, "Ignoring upload field"),
        }
    }

    let (file_name, bytes) =
        file.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;

    let created = state
        .directory()
        .upload_file(
            &slug,
            UploadRequest {
                file_name,
                bytes,
                description,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Open a listed file in the viewer
async fn open_file(
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<ViewState>), AppError> {
    let listing = state.directory().get_listing(&slug).await?;
    let entry = listing
        .file(&id)
        .ok_or_else(|| AppError::NotFound(format!("File {} in {}", id, slug)))?;

    state.viewer().open_document(entry.to_reference())?;
    Ok((StatusCode::ACCEPTED, Json(state.viewer().state())))
}

async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<StatusCode, AppError> {
    state
        .directory()
        .delete_file(&id, query.directory.as_deref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::routes::app;
    use crate::routes::test_support::*;
    use crate::testing::FakeFetcher;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    #[tokio::test]
    async fn test_listing_and_missing_folder() {
        let app = app(state(FakeFetcher::new()));

        let (status, json) = send_json(&app, get("/api/v1/directories/proj-1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["name"], "proj-1");
        assert_eq!(json["files"][0]["name"], "plan.pdf");

        let (status, json) = send_json(&app, get("/api/v1/directories/missing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "not_found");
    }

    #[tokio::test]
    async fn test_open_listed_file_uses_entry_proxy() {
        let state = state(FakeFetcher::new());
        let app = app(state.clone());

        let (status, json) = send_json(&app, post("/api/v1/directories/proj-1/files/1/open")).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(json["document"]["target"]["kind"], "entry");
        state.viewer().settle().await;

        let (status, json) = send_json(&app, post("/api/v1/viewer/external")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["url"], "http://files.local/api/files/pdf-proxy/1/");

        let (status, _) = send_json(&app, post("/api/v1/directories/proj-1/files/9/open")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_multipart() {
        let app = app(state(FakeFetcher::new()));
        let boundary = "XBOUNDARY";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"new.pdf\"\r\n\
             Content-Type: application/pdf\r\n\r\n%PDF-1.4\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"description\"\r\n\r\nRev B\r\n\
             --{b}--\r\n",
            b = boundary
        );
        let request = Request::post("/api/v1/directories/proj-1/files")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();

        let (status, json) = send_json(&app, request).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["name"], "new.pdf");
    }

    #[tokio::test]
    async fn test_upload_without_file_is_bad_request() {
        let app = app(state(FakeFetcher::new()));
        let request = Request::post("/api/v1/directories/proj-1/files")
            .header("content-type", "multipart/form-data; boundary=X")
            .body(Body::from("--X--\r\n"))
            .unwrap();

        let (status, _) = send_json(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_file() {
        let app = app(state(FakeFetcher::new()));
        let request = Request::delete("/api/v1/files/1?directory=proj-1")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}

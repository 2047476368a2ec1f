//! Viewer API endpoints
//!
//! The browser UI shell drives the single viewer slot through these:
//! - Open, close, retry and reopen documents
//! - Page navigation and zoom
//! - Fetch the displayed page as PNG
//! - Report native embed load results
//! - Observe state changes as server-sent events

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::document::DocumentReference;
use crate::error::{AppError, ViewerError};
use crate::session::ViewState;
use crate::state::AppState;

/// Body of `POST /open`; exactly one of `url` and `entry_id`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenRequest {
    pub url: Option<String>,
    pub entry_id: Option<String>,
    pub name: Option<String>,
}

impl OpenRequest {
    fn into_reference(self) -> Result<DocumentReference, AppError> {
        match (self.url, self.entry_id) {
            (Some(url), None) => {
                let name = self.name.unwrap_or_else(|| name_from_url(&url));
                Ok(DocumentReference::from_url(url, name))
            }
            (None, Some(id)) => {
                let name = self.name.unwrap_or_else(|| format!("{}.pdf", id));
                Ok(DocumentReference::from_entry(id, name))
            }
            _ => Err(AppError::BadRequest(
                "Provide exactly one of url and entryId".to_string(),
            )),
        }
    }
}

fn name_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    if decoded.is_empty() {
        "document.pdf".to_string()
    } else {
        decoded
    }
}

/// Body of `POST /zoom`; `value` is absolute, `delta` relative
#[derive(Debug, Deserialize)]
pub struct ZoomRequest {
    pub value: Option<f32>,
    pub delta: Option<f32>,
}

/// Body of `POST /embed/failed`
#[derive(Debug, Deserialize)]
pub struct EmbedFailure {
    #[serde(default)]
    pub message: String,
}

/// Pending native embed load
#[derive(Serialize)]
pub struct EmbedResponse {
    pub url: Option<String>,
}

/// Target for "open in new window"
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalResponse {
    pub url: String,
    pub download_name: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/state", get(get_state))
        .route("/events", get(state_events))
        .route("/open", post(open_document))
        .route("/close", post(close_document))
        .route("/retry", post(retry))
        .route("/reopen", post(reopen))
        .route("/next", post(next_page))
        .route("/prev", post(prev_page))
        .route("/page/:page", post(jump_to_page))
        .route("/zoom", post(zoom))
        .route("/zoom/in", post(zoom_in))
        .route("/zoom/out", post(zoom_out))
        .route("/zoom/reset", post(reset_zoom))
        .route("/surface.png", get(surface_png))
        .route("/embed", get(pending_embed))
        .route("/embed/loaded", post(embed_loaded))
        .route("/embed/failed", post(embed_failed))
        .route("/external", get(open_externally).post(open_externally))
}

async fn get_state(State(state): State<AppState>) -> Json<ViewState> {
    Json(state.viewer().state())
}

/// Current state first, then one event per change
async fn state_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let mut rx = state.viewer().observe_state();
    let current = rx.borrow_and_update().clone();

    let changes = stream::unfold(rx, |mut rx| async move {
        rx.changed().await.ok()?;
        let next = rx.borrow_and_update().clone();
        Some((next, rx))
    });

    let events = stream::once(async move { current })
        .chain(changes)
        .map(|view| Event::default().event("state").json_data(view));

    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn open_document(
    State(state): State<AppState>,
    Json(request): Json<OpenRequest>,
) -> Result<(StatusCode, Json<ViewState>), AppError> {
    let reference = request.into_reference()?;
    state.viewer().open_document(reference)?;
    Ok((StatusCode::ACCEPTED, Json(state.viewer().state())))
}

async fn close_document(State(state): State<AppState>) -> Json<ViewState> {
    state.viewer().close();
    Json(state.viewer().state())
}

async fn retry(State(state): State<AppState>) -> Result<(StatusCode, Json<ViewState>), AppError> {
    state.viewer().retry()?;
    Ok((StatusCode::ACCEPTED, Json(state.viewer().state())))
}

async fn reopen(State(state): State<AppState>) -> Result<(StatusCode, Json<ViewState>), AppError> {
    state.viewer().reopen()?;
    Ok((StatusCode::ACCEPTED, Json(state.viewer().state())))
}

async fn next_page(State(state): State<AppState>) -> Json<ViewState> {
    state.viewer().next_page();
    Json(state.viewer().state())
}

async fn prev_page(State(state): State<AppState>) -> Json<ViewState> {
    state.viewer().prev_page();
    Json(state.viewer().state())
}

async fn jump_to_page(
    State(state): State<AppState>,
    Path(page): Path<i64>,
) -> Json<ViewState> {
    state.viewer().jump_to_page(page);
    Json(state.viewer().state())
}

async fn zoom(
    State(state): State<AppState>,
    Json(request): Json<ZoomRequest>,
) -> Result<Json<ViewState>, AppError> {
    match (request.value, request.delta) {
        (Some(value), None) => state.viewer().set_zoom(value),
        (None, Some(delta)) => state.viewer().zoom_by(delta),
        _ => {
            return Err(AppError::BadRequest(
                "Provide exactly one of value and delta".to_string(),
            ))
        }
    }
    Ok(Json(state.viewer().state()))
}

async fn zoom_in(State(state): State<AppState>) -> Json<ViewState> {
    state.viewer().zoom_in();
    Json(state.viewer().state())
}

async fn zoom_out(State(state): State<AppState>) -> Json<ViewState> {
    state.viewer().zoom_out();
    Json(state.viewer().state())
}

async fn reset_zoom(State(state): State<AppState>) -> Json<ViewState> {
    state.viewer().reset_zoom();
    Json(state.viewer().state())
}

/// The page currently on screen, as PNG
async fn surface_png(State(state): State<AppState>) -> Result<Response, AppError> {
    let surface = state
        .viewer()
        .displayed_surface()
        .ok_or(ViewerError::NotReady)?;

    let png = tokio::task::spawn_blocking(move || surface.to_png())
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))??;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        Body::from(png),
    )
        .into_response())
}

async fn pending_embed(State(state): State<AppState>) -> Json<EmbedResponse> {
    Json(EmbedResponse {
        url: state.embed_host().pending_url(),
    })
}

async fn embed_loaded(State(state): State<AppState>) -> StatusCode {
    if state.embed_host().signal_loaded() {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::CONFLICT
    }
}

async fn embed_failed(
    State(state): State<AppState>,
    Json(failure): Json<EmbedFailure>,
) -> StatusCode {
    if state.embed_host().signal_failed(failure.message) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::CONFLICT
    }
}

async fn open_externally(
    State(state): State<AppState>,
) -> Result<Json<ExternalResponse>, AppError> {
    let url = state.viewer().open_externally()?;
    Ok(Json(ExternalResponse {
        url,
        download_name: state.viewer().download_name(),
    }))
}

#[cfg(test)]
mod tests {
    use super::name_from_url;
    use crate::routes::app;
    use crate::routes::test_support::*;
    use crate::testing::FakeFetcher;
    use axum::http::StatusCode;
    use serde_json::json;

    const GIVEN: &str = "http://files.local/files/plan.pdf";

    #[test]
    fn test_name_from_url() {
        assert_eq!(name_from_url("/files/Ritning%20A.pdf?x=1"), "Ritning A.pdf");
        assert_eq!(name_from_url("/"), "document.pdf");
    }

    #[tokio::test]
    async fn test_open_requires_exactly_one_target() {
        let app = app(state(FakeFetcher::new()));
        let (status, json) = send_json(
            &app,
            post_json("/api/v1/viewer/open", json!({ "url": "/a.pdf", "entryId": "1" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "bad_request");
    }

    #[tokio::test]
    async fn test_open_navigate_and_fetch_surface() {
        let state = state(FakeFetcher::new().with_pdf(GIVEN, 3));
        let app = app(state.clone());

        let (status, json) = send_json(
            &app,
            post_json("/api/v1/viewer/open", json!({ "url": "/files/plan.pdf" })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(json["document"]["displayName"], "plan.pdf");
        state.viewer().settle().await;

        let (status, json) = send_json(&app, get("/api/v1/viewer/state")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["load_state"], "ready");
        assert_eq!(json["total_pages"], 3);

        let (_, json) = send_json(&app, post("/api/v1/viewer/page/99")).await;
        assert_eq!(json["current_page"], 3);
        state.viewer().settle().await;

        let (_, json) = send_json(&app, post_json("/api/v1/viewer/zoom", json!({ "value": 2.0 }))).await;
        assert_eq!(json["scale"], 2.0);
        state.viewer().settle().await;

        let (status, body) = send(&app, get("/api/v1/viewer/surface.png")).await;
        assert_eq!(status, StatusCode::OK);
        let image = image::load_from_memory(&body).unwrap();
        // 200x100 pages at 2.0
        assert_eq!((image.width(), image.height()), (400, 200));
    }

    #[tokio::test]
    async fn test_surface_before_ready_conflicts() {
        let app = app(state(FakeFetcher::new()));
        let (status, json) = send_json(&app, get("/api/v1/viewer/surface.png")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"], "not_ready");
    }

    #[tokio::test]
    async fn test_external_without_document_is_not_found() {
        let app = app(state(FakeFetcher::new()));
        let (status, _) = send_json(&app, post("/api/v1/viewer/external")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_external_after_exhausted_chain() {
        let state = state(FakeFetcher::new());
        let app = app(state.clone());

        send_json(
            &app,
            post_json("/api/v1/viewer/open", json!({ "url": "/files/plan.pdf" })),
        )
        .await;
        state.viewer().settle().await;

        let (_, json) = send_json(&app, get("/api/v1/viewer/state")).await;
        assert_eq!(json["load_state"], "error");
        assert_eq!(json["error"]["kind"], "chain_exhausted");

        let (status, json) = send_json(&app, post("/api/v1/viewer/external")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["url"], GIVEN);
        assert_eq!(json["downloadName"], "plan.pdf");
    }

    #[tokio::test]
    async fn test_embed_signal_without_pending_load_conflicts() {
        let app = app(state(FakeFetcher::new()));
        let (status, _) = send(&app, post("/api/v1/viewer/embed/loaded")).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, json) = send_json(&app, get("/api/v1/viewer/embed")).await;
        assert_eq!(json["url"], serde_json::Value::Null);
    }
}

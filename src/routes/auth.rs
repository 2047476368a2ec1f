//! Session token endpoints
//!
//! The shell reports login and logout here; the token store feeds every
//! fetch the viewer and directory client make afterwards.

use axum::{extract::State, http::StatusCode, routing::put, Json, Router};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
    /// Token came from another tab; only the mirrored copy is updated
    #[serde(default)]
    pub mirrored: bool,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/token", put(set_token).delete(clear_token))
}

async fn set_token(
    State(state): State<AppState>,
    Json(request): Json<TokenRequest>,
) -> Result<StatusCode, AppError> {
    let token = request.token.trim();
    if token.is_empty() {
        return Err(AppError::BadRequest("Token must not be empty".to_string()));
    }
    if request.mirrored {
        state.tokens().set_mirrored(token);
    } else {
        state.tokens().set_token(token);
    }
    // Listings fetched anonymously may differ from what the user can now see
    state.directory().invalidate_all();
    tracing::info!(mirrored = request.mirrored, "Session token updated");
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_token(State(state): State<AppState>) -> StatusCode {
    state.tokens().clear();
    state.directory().invalidate_all();
    tracing::info!("Session token cleared");
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use crate::credentials::CredentialProvider;
    use crate::routes::app;
    use crate::routes::test_support::*;
    use crate::testing::FakeFetcher;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_login_and_logout() {
        let state = state(FakeFetcher::new());
        let app = app(state.clone());

        let request = Request::put("/api/v1/session/token")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "token": "abc" }).to_string()))
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(state.tokens().token().as_deref(), Some("abc"));

        let request = Request::delete("/api/v1/session/token").body(Body::empty()).unwrap();
        send(&app, request).await;
        assert_eq!(state.tokens().token(), None);
    }

    #[tokio::test]
    async fn test_empty_token_rejected() {
        let app = app(state(FakeFetcher::new()));
        let request = Request::put("/api/v1/session/token")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "token": " " }).to_string()))
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

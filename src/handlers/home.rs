//! Home page handler.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;

use crate::router::AppState;
use crate::views::{render, IndexView};

/// GET / - Shows the configured storage account.
pub async fn home(State(state): State<AppState>) -> Response {
    let view = match state.service.settings().load() {
        Ok(settings) => IndexView {
            account_name: Some(settings.account_name),
            message: None,
        },
        Err(e) => IndexView {
            account_name: None,
            message: Some(e.to_string()),
        },
    };
    render(&view, StatusCode::OK)
}

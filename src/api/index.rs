use super::AppState;
use crate::preview::html_page;
use crate::snapshot::EntityId;
use axum::{
    extract::State,
    response::{Html, Json},
};
use std::sync::Arc;

/// Browser side of the live view: follows `msg`, fills each `g.node` with its
/// status color and keeps the `last_update` banner current
pub const LIVE_VIEW_JS: &str = include_str!("live_view.js");

/// GET / - Diagram page with the connection banner and live view script
pub(super) async fn index_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let diagram = state
        .diagram_svg
        .as_deref()
        .unwrap_or("<p>No diagram configured</p>");
    let body = format!("{}\n<script>\n{}</script>\n", diagram, LIVE_VIEW_JS);
    Html(html_page(
        "bt_live",
        "<div id=\"last_update\">..</div>\n",
        &body,
    ))
}

/// GET /api/entities - Entity IDs of the served diagram
pub(super) async fn list_entities(State(state): State<Arc<AppState>>) -> Json<Vec<EntityId>> {
    Json(state.board.entities().to_vec())
}

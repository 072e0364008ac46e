use axum::{
    extract::State,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use crate::ipc::{self, AppState, Request};

/// The page talks to the daemon through one POST endpoint carrying the same
/// envelope as sidecar mode; there are no other routes.
pub async fn serve(addr: &str, state: AppState) -> anyhow::Result<()> {
    let shared = Arc::new(Mutex::new(state));
    let app = Router::new()
        .route("/", get(serve_page))
        .route("/rpc", post(rpc))
        .with_state(shared);

    let listener = TcpListener::bind(addr).await?;
    log::info!("listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn serve_page() -> Html<&'static str> {
    Html(include_str!("static/index.html"))
}

async fn rpc(
    State(state): State<Arc<Mutex<AppState>>>,
    Json(req): Json<Request>,
) -> Json<serde_json::Value> {
    let mut state = state.lock().expect("state lock");
    Json(ipc::handle_request(&mut state, req))
}

//! Read side of the store: one JSON endpoint listing every persisted post.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use postwatch_core::{CoreError, ErrorExt, Record};
use serde::Serialize;
use std::net::SocketAddr;
use store::RecordStore;
use tower_http::trace::TraceLayer;
use tracing::info;

#[cfg(test)]
mod tests;

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

struct ReadError(CoreError);

impl IntoResponse for ReadError {
    fn into_response(self) -> Response {
        self.0.log_error();
        let body = ErrorBody {
            code: self.0.error_code(),
            message: self.0.user_friendly_message(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Reads the whole store on every request, so records appended by the
/// poller show up without a restart.
async fn list_records(State(store): State<RecordStore>) -> Result<Json<Vec<Record>>, ReadError> {
    let records = store.read_all().await.map_err(ReadError)?;
    Ok(Json(records))
}

pub fn router(store: RecordStore) -> Router {
    Router::new()
        .route("/", get(list_records))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

pub async fn serve(store: RecordStore, addr: SocketAddr) -> Result<(), CoreError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        "Serving {} on http://{}",
        store.path().display(),
        listener.local_addr()?
    );
    axum::serve(listener, router(store)).await?;
    Ok(())
}

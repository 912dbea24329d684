use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::debug;

use crate::scan::safe_relative_path;
use crate::state::AppState;

/// Serve a file from inside a discovered shot directory.
pub async fn get_data(
    State(state): State<AppState>,
    Path(rest): Path<String>,
    request: Request,
) -> Response {
    let target = {
        let index = state.index.read().await;
        index
            .resolve_data_path(&rest)
            .and_then(|(shot, file)| Some(shot.fs_path.join(safe_relative_path(file)?)))
    };

    let Some(target) = target else {
        state.observability.record_data_rejected();
        debug!(path = %rest, "data request outside any mapshot");
        return StatusCode::NOT_FOUND.into_response();
    };

    match ServeFile::new(target).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}

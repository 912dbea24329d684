use std::path::Path;

use axum::{
    Router,
    extract::Request,
    http::{HeaderValue, header},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use tower_http::compression::CompressionLayer;
use tower_http::services::{ServeDir, ServeFile};

use crate::routes;
use crate::state::AppState;

pub(crate) fn build_app(state: AppState) -> Router {
    // The listing page and the viewer are the same client bundle; it picks a mode from the path.
    let index_html = state.client_dist.join("index.html");
    let static_assets = Router::new()
        .nest_service(
            "/map",
            ServeDir::new(&state.client_dist)
                .precompressed_br()
                .precompressed_gzip()
                .fallback(ServeFile::new(&index_html)),
        )
        .fallback_service(
            ServeDir::new(&state.client_dist)
                .precompressed_br()
                .precompressed_gzip()
                .fallback(ServeFile::new(&index_html)),
        );

    let app = Router::new()
        .route("/shots.json", get(routes::api::get_shots))
        .route("/latest/{*savename}", get(routes::api::get_latest))
        .route("/data/{*rest}", get(routes::data::get_data))
        .route("/api/health", get(routes::api::health))
        .route("/api/metrics", get(routes::api::metrics));

    app.layer(CompressionLayer::new())
        .fallback_service(static_assets)
        .layer(middleware::from_fn(set_static_cache_control))
        .with_state(state)
}

async fn set_static_cache_control(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let mut response = next.run(request).await;

    if response.status().is_success()
        && !response.headers().contains_key(header::CACHE_CONTROL)
        && let Some(cache_control) = cache_control_for_path(&path)
    {
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(cache_control),
        );
    }

    response
}

fn cache_control_for_path(path: &str) -> Option<&'static str> {
    if let Some(data) = path.strip_prefix("/data/") {
        return Some(cache_control_for_data(data));
    }

    if is_hashed_bundle_asset(path) {
        return Some("public, max-age=31536000, immutable");
    }

    None
}

fn cache_control_for_data(path: &str) -> &'static str {
    match Path::new(path).extension().and_then(|ext| ext.to_str()) {
        Some("jpg" | "jpeg" | "png" | "webp") => "public, max-age=86400",
        _ => "no-cache",
    }
}

fn is_hashed_bundle_asset(path: &str) -> bool {
    let Some(ext) = Path::new(path).extension().and_then(|ext| ext.to_str()) else {
        return false;
    };

    if !matches!(ext, "wasm" | "js" | "css") {
        return false;
    }

    let Some(filename) = Path::new(path).file_name().and_then(|name| name.to_str()) else {
        return false;
    };

    filename
        .split(['-', '_', '.'])
        .any(|segment| segment.len() >= 8 && segment.chars().all(|c| c.is_ascii_hexdigit()))
}

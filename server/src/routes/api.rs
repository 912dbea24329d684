use std::fmt::Write as _;
use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use crate::state::{AppState, ObservabilitySnapshot};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";
const LISTING_CACHE_CONTROL: &str = "no-cache";

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let (shots, saves, generation, last_scan) = {
        let index = state.index.read().await;
        (
            index.shots.len(),
            index.save_count,
            index.generation,
            index.scanned_at.map(|at| at.to_rfc3339()),
        )
    };
    let observability = state.observability.snapshot();
    Json(serde_json::json!({
        "status": "ok",
        "shots": shots,
        "saves": saves,
        "generation": generation,
        "last_scan": last_scan,
        "observability": {
            "scans_total": observability.scans_total,
            "scan_failures_total": observability.scan_failures_total,
            "listing_requests_total": observability.listing_requests_total,
            "latest_requests_total": observability.latest_requests_total,
            "latest_misses_total": observability.latest_misses_total,
            "data_rejected_total": observability.data_rejected_total,
        }
    }))
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let (shots, saves) = {
        let index = state.index.read().await;
        (index.shots.len(), index.save_count)
    };
    let body = render_prometheus_metrics(shots, saves, state.observability.snapshot());

    (
        [
            (header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
}

fn render_prometheus_metrics(
    shot_count: usize,
    save_count: usize,
    observability: ObservabilitySnapshot,
) -> String {
    let series: [(&str, &str, &str, u64); 8] = [
        (
            "mapshot_shots",
            "gauge",
            "Mapshots in the current index.",
            shot_count as u64,
        ),
        (
            "mapshot_saves",
            "gauge",
            "Distinct saves in the current index.",
            save_count as u64,
        ),
        (
            "mapshot_scans_total",
            "counter",
            "Total data directory scans.",
            observability.scans_total,
        ),
        (
            "mapshot_scan_failures_total",
            "counter",
            "Total scans that kept the previous index.",
            observability.scan_failures_total,
        ),
        (
            "mapshot_listing_requests_total",
            "counter",
            "Total /shots.json requests.",
            observability.listing_requests_total,
        ),
        (
            "mapshot_latest_requests_total",
            "counter",
            "Total /latest share-link lookups.",
            observability.latest_requests_total,
        ),
        (
            "mapshot_latest_misses_total",
            "counter",
            "Total share-link lookups for unknown saves.",
            observability.latest_misses_total,
        ),
        (
            "mapshot_data_rejected_total",
            "counter",
            "Total /data requests outside any shot.",
            observability.data_rejected_total,
        ),
    ];

    let mut body = String::new();
    for (name, kind, help, value) in series {
        let _ = writeln!(body, "# HELP {name} {help}");
        let _ = writeln!(body, "# TYPE {name} {kind}");
        let _ = writeln!(body, "{name} {value}");
    }
    body
}

/// Serve the pre-serialized listing; revalidates through the scan generation.
pub async fn get_shots(State(state): State<AppState>, headers: HeaderMap) -> Response {
    state.observability.record_listing_request();
    let (etag, json): (String, Arc<Bytes>) = {
        let index = state.index.read().await;
        (index.etag(), Arc::clone(&index.listing_json))
    };

    if if_none_match_matches(&headers, &etag) {
        return not_modified_response(LISTING_CACHE_CONTROL, Some(etag.as_str()));
    }

    json_bytes_response((*json).clone(), LISTING_CACHE_CONTROL, Some(etag.as_str()))
}

/// Where the newest render of a save lives, for share links.
pub async fn get_latest(
    State(state): State<AppState>,
    Path(savename): Path<String>,
) -> Response {
    state.observability.record_latest_request();
    let found = {
        let index = state.index.read().await;
        index.latest.get(savename.trim_end_matches('/')).cloned()
    };

    match found {
        Some(json) => json_bytes_response((*json).clone(), LISTING_CACHE_CONTROL, None),
        None => {
            state.observability.record_latest_miss();
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

fn json_bytes_response(body: Bytes, cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = Response::new(Body::from(body));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn not_modified_response(cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn normalize_etag(candidate: &str) -> &str {
    candidate.strip_prefix("W/").unwrap_or(candidate).trim()
}

fn if_none_match_matches(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers.get(header::IF_NONE_MATCH) else {
        return false;
    };
    let Ok(raw) = value.to_str() else {
        return false;
    };

    raw.split(',').any(|candidate| {
        let candidate = candidate.trim();
        candidate == "*" || normalize_etag(candidate) == normalize_etag(etag)
    })
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
    use mapshot_shared::{LinkTarget, ShotsJson};

    use super::{if_none_match_matches, render_prometheus_metrics};
    use crate::routes::test_support::{fixture_tree, spawn_test_server};
    use crate::services::shot_scanner::scan_once;
    use crate::state::{AppState, ObservabilitySnapshot};

    async fn scanned_state(root: &std::path::Path) -> AppState {
        fixture_tree(root);
        let state = AppState::with_dirs(root.to_path_buf(), root.join("dist"));
        scan_once(&state).await;
        state
    }

    #[test]
    fn if_none_match_accepts_weak_and_list_forms() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::IF_NONE_MATCH,
            HeaderValue::from_static("\"shots-1\", W/\"shots-3\""),
        );
        assert!(if_none_match_matches(&headers, "\"shots-3\""));
        assert!(!if_none_match_matches(&headers, "\"shots-2\""));
        assert!(!if_none_match_matches(&HeaderMap::new(), "\"shots-3\""));
    }

    #[test]
    fn metrics_output_contains_help_type_and_values() {
        let observability = ObservabilitySnapshot {
            scans_total: 12,
            scan_failures_total: 1,
            listing_requests_total: 40,
            latest_requests_total: 3,
            latest_misses_total: 2,
            data_rejected_total: 5,
        };

        let metrics = render_prometheus_metrics(7, 2, observability);
        assert!(metrics.contains("# TYPE mapshot_shots gauge"));
        assert!(metrics.contains("mapshot_shots 7\n"));
        assert!(metrics.contains("mapshot_saves 2\n"));
        assert!(metrics.contains("# TYPE mapshot_scans_total counter"));
        assert!(metrics.contains("mapshot_scans_total 12\n"));
        assert!(metrics.contains("mapshot_data_rejected_total 5\n"));
    }

    #[tokio::test]
    async fn shots_listing_is_grouped_and_revalidates() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let state = scanned_state(tmp.path()).await;
        let (addr, server_handle) = spawn_test_server(state).await;
        let client = reqwest::Client::new();

        let response = client
            .get(format!("http://{addr}/shots.json"))
            .send()
            .await
            .expect("listing request");
        assert_eq!(response.status(), StatusCode::OK);
        let etag = response
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .expect("listing etag");
        let listing: ShotsJson = response.json().await.expect("parse listing");

        let saves: Vec<&str> = listing.all.iter().map(|s| s.savename.as_str()).collect();
        assert_eq!(saves, vec!["mapshot/factory", "mapshot/old save"]);
        let factory = &listing.all[0];
        assert_eq!(factory.versions.len(), 2);
        assert_eq!(factory.versions[0].name, "mapshot/factory/d-100");
        assert_eq!(factory.versions[0].path, "/data/mapshot/factory/d-100/");
        assert_eq!(factory.versions[0].ticks_played, 216000);
        assert_eq!(factory.versions[0].surface, "nauvis, platform-1");
        assert_eq!(factory.versions[1].name, "mapshot/factory/d-050");

        let revalidated = client
            .get(format!("http://{addr}/shots.json"))
            .header(header::IF_NONE_MATCH, etag)
            .send()
            .await
            .expect("conditional listing request");
        assert_eq!(revalidated.status(), StatusCode::NOT_MODIFIED);

        server_handle.abort();
        let _ = server_handle.await;
    }

    #[tokio::test]
    async fn latest_resolves_newest_version_or_404() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let state = scanned_state(tmp.path()).await;
        let (addr, server_handle) = spawn_test_server(state.clone()).await;
        let client = reqwest::Client::new();

        let target: LinkTarget = client
            .get(format!("http://{addr}/latest/mapshot/old%20save"))
            .send()
            .await
            .expect("latest request")
            .error_for_status()
            .expect("latest status")
            .json()
            .await
            .expect("parse link target");
        assert_eq!(target.path.as_deref(), Some("/data/mapshot/old save/v1/"));
        assert_eq!(target.load_path(), Some("/data/mapshot/old%20save/v1/"));

        let newest: LinkTarget = client
            .get(format!("http://{addr}/latest/mapshot/factory"))
            .send()
            .await
            .expect("latest request")
            .json()
            .await
            .expect("parse link target");
        assert_eq!(newest.path.as_deref(), Some("/data/mapshot/factory/d-100/"));

        let missing = client
            .get(format!("http://{addr}/latest/mapshot/unknown"))
            .send()
            .await
            .expect("latest request");
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let counters = state.observability.snapshot();
        assert_eq!(counters.latest_requests_total, 3);
        assert_eq!(counters.latest_misses_total, 1);

        server_handle.abort();
        let _ = server_handle.await;
    }

    #[tokio::test]
    async fn health_and_metrics_expose_expected_contract() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let state = scanned_state(tmp.path()).await;
        let (addr, server_handle) = spawn_test_server(state).await;
        let client = reqwest::Client::new();

        let health = client
            .get(format!("http://{addr}/api/health"))
            .send()
            .await
            .expect("health request")
            .error_for_status()
            .expect("health status")
            .json::<serde_json::Value>()
            .await
            .expect("parse health");

        assert_eq!(health.get("status").and_then(|v| v.as_str()), Some("ok"));
        assert_eq!(health.get("shots").and_then(|v| v.as_u64()), Some(3));
        assert_eq!(health.get("saves").and_then(|v| v.as_u64()), Some(2));
        let last_scan = health
            .get("last_scan")
            .and_then(|v| v.as_str())
            .expect("last scan time");
        assert!(chrono::DateTime::parse_from_rfc3339(last_scan).is_ok());
        assert_eq!(
            health
                .get("observability")
                .and_then(|v| v.get("scans_total"))
                .and_then(|v| v.as_u64()),
            Some(1)
        );

        let metrics = client
            .get(format!("http://{addr}/api/metrics"))
            .send()
            .await
            .expect("metrics request")
            .error_for_status()
            .expect("metrics status")
            .text()
            .await
            .expect("parse metrics text");
        assert!(metrics.contains("mapshot_shots 3\n"));
        assert!(metrics.contains("mapshot_scan_failures_total 0\n"));

        server_handle.abort();
        let _ = server_handle.await;
    }
}

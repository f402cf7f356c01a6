use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use lightdash_core::client::{ClientConfig, LightdashClient};
use lightdash_core::control::LightdashControl;
use serde_json::{Value, json};

const TILE_COUNT: u64 = 6;
const CONCURRENCY: usize = 2;

#[derive(Default)]
struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

fn envelope(results: Value) -> Json<Value> {
    Json(json!({ "status": "ok", "results": results }))
}

fn dashboard() -> Value {
    let tiles: Vec<Value> = (0..TILE_COUNT)
        .map(|index| {
            json!({
                "uuid": format!("t{index}"),
                "type": "saved_chart",
                "properties": {"title": format!("Tile {index}"), "savedChartUuid": format!("c{index}")}
            })
        })
        .collect();
    json!({"uuid": "d1", "name": "Ops", "filters": {}, "tiles": tiles})
}

/// Chart results endpoint that records how many calls overlap. Earlier charts
/// answer more slowly so completion order differs from tile order.
async fn chart_results(
    State(in_flight): State<Arc<InFlight>>,
    Path(chart): Path<String>,
) -> Json<Value> {
    let now = in_flight.current.fetch_add(1, Ordering::SeqCst) + 1;
    in_flight.peak.fetch_max(now, Ordering::SeqCst);

    let index: u64 = chart.trim_start_matches('c').parse().unwrap_or(0);
    tokio::time::sleep(Duration::from_millis(20 * (TILE_COUNT - index))).await;

    in_flight.current.fetch_sub(1, Ordering::SeqCst);
    envelope(json!({
        "rows": [{"chart": {"value": {"raw": chart}}}],
        "fields": {}
    }))
}

async fn spawn_stub(in_flight: Arc<InFlight>) -> String {
    let app = Router::new()
        .route(
            "/api/v1/projects/p1/dashboards",
            get(|| async { envelope(json!([{"uuid": "d1", "name": "Ops"}])) }),
        )
        .route("/api/v1/dashboards/d1", get(|| async { envelope(dashboard()) }))
        .route("/api/v1/saved/:chart/results", post(chart_results))
        .with_state(in_flight);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("stub should bind");
    let addr = listener.local_addr().expect("stub address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub should serve");
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn tile_fan_out_respects_concurrency_and_keeps_tile_order() {
    let in_flight = Arc::new(InFlight::default());
    let base_url = spawn_stub(in_flight.clone()).await;
    let client = LightdashClient::new(&ClientConfig::new(base_url, "test-token"))
        .expect("client should build");
    let control = LightdashControl::new(client)
        .with_default_project(Some("p1".to_string()))
        .with_tile_concurrency(CONCURRENCY);

    let report = control
        .run_dashboard_tiles("Ops", None)
        .await
        .expect("fan-out should complete");

    assert_eq!(in_flight.peak.load(Ordering::SeqCst), CONCURRENCY);
    assert_eq!(in_flight.current.load(Ordering::SeqCst), 0);

    let keys: Vec<&str> = report.results.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["t0", "t1", "t2", "t3", "t4", "t5"]);
    for (index, tile) in report.results.values().enumerate() {
        assert_eq!(tile["status"], "success");
        assert_eq!(
            tile["csv_data"],
            format!("# Metadata: {{\"row_count\":1,\"fields\":{{}}}}\nchart\nc{index}\n")
        );
    }
}

#[tokio::test]
async fn single_slot_fan_out_runs_tiles_one_at_a_time() {
    let in_flight = Arc::new(InFlight::default());
    let base_url = spawn_stub(in_flight.clone()).await;
    let client = LightdashClient::new(&ClientConfig::new(base_url, "test-token"))
        .expect("client should build");
    let control = LightdashControl::new(client)
        .with_default_project(Some("p1".to_string()))
        .with_tile_concurrency(1);

    let wanted = ["t4".to_string(), "t1".to_string(), "t2".to_string()];
    let report = control
        .run_dashboard_tiles("Ops", Some(wanted.as_slice()))
        .await
        .expect("fan-out should complete");

    assert_eq!(in_flight.peak.load(Ordering::SeqCst), 1);
    let keys: Vec<&str> = report.results.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["t1", "t2", "t4"]);
}

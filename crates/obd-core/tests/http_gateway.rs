//! HttpGateway against an in-process axum backend.

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use obd_core::{BackendGateway, GatewayError, HttpGateway, Severity};
use serde_json::{json, Value};
use std::time::Duration;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn gateway(base_url: &str) -> HttpGateway {
    HttpGateway::new(base_url, Duration::from_secs(2)).unwrap()
}

/// Base URL of a port nothing listens on.
async fn closed_port() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn healthy_backend() -> Router {
    Router::new()
        .route(
            "/api/obd/pids",
            get(|| async {
                Json(json!({ "supported": { "010C": "Engine RPM", "010D": "Vehicle speed" } }))
            }),
        )
        .route(
            "/api/obd/live",
            get(|| async {
                Json(json!({
                    "rpm": 812,
                    "speed": 0,
                    "coolant_temp": 88,
                    "throttle": 14.5,
                    "load": 22
                }))
            }),
        )
        .route(
            "/api/obd/diagnostics",
            get(|| async {
                Json(json!({ "dtcs": [
                    { "code": "P0420", "severity": "moyenne", "description": "Efficacité catalyseur" },
                    { "code": "P0300", "severity": 2, "description": "Ratés d'allumage" }
                ]}))
            }),
        )
        .route(
            "/api/chat",
            post(|Json(body): Json<Value>| async move {
                let question = body["question"].as_str().unwrap_or_default().to_string();
                Json(json!({
                    "answer": format!("Vous avez demandé : {}", question),
                    "tips": ["Vérifier la sonde lambda", "Contrôler l'échappement"]
                }))
            }),
        )
}

#[tokio::test]
async fn healthy_backend_round_trip() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let gw = gateway(&serve(healthy_backend()).await);

    let pids = gw.fetch_pid_catalog().await;
    assert_eq!(pids.get("010C").map(String::as_str), Some("Engine RPM"));
    assert_eq!(pids.len(), 2);

    let live = gw.fetch_live_snapshot().await.unwrap();
    assert_eq!(live.rpm, Some(812.0));
    assert_eq!(live.coolant_temp, Some(88.0));
    assert_eq!(live.intake_temp, None);

    let dtcs = gw.fetch_diagnostics().await;
    let codes: Vec<&str> = dtcs.iter().map(|d| d.code.as_str()).collect();
    assert_eq!(codes, vec!["P0420", "P0300"]);
    assert_eq!(dtcs[1].severity, Severity::Level(2));

    let reply = gw.post_question("Que signifie P0420 ?").await.unwrap();
    assert_eq!(reply.answer, "Vous avez demandé : Que signifie P0420 ?");
    assert_eq!(reply.tips.len(), 2);
}

#[tokio::test]
async fn missing_fields_default_to_empty() {
    let app = Router::new()
        .route("/api/obd/pids", get(|| async { Json(json!({})) }))
        .route("/api/obd/diagnostics", get(|| async { Json(json!({ "dtcs": null })) }))
        .route("/api/chat", post(|| async { Json(json!({ "answer": null })) }));
    let gw = gateway(&serve(app).await);

    assert!(gw.fetch_pid_catalog().await.is_empty());
    assert!(gw.fetch_diagnostics().await.is_empty());

    let reply = gw.post_question("").await.unwrap();
    assert_eq!(reply.answer, "");
    assert!(reply.tips.is_empty());
}

#[tokio::test]
async fn live_status_failure_is_connectivity_error() {
    let app = Router::new().route(
        "/api/obd/live",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "simulator offline") }),
    );
    let gw = gateway(&serve(app).await);

    let err = gw.fetch_live_snapshot().await.unwrap_err();
    assert!(matches!(err, GatewayError::Connectivity(_)), "{err:?}");
}

#[tokio::test]
async fn live_garbage_body_is_connectivity_error() {
    let app = Router::new().route("/api/obd/live", get(|| async { "not json" }));
    let gw = gateway(&serve(app).await);

    assert!(matches!(
        gw.fetch_live_snapshot().await,
        Err(GatewayError::Connectivity(_))
    ));
}

#[tokio::test]
async fn unreachable_backend_degrades_per_call() {
    let gw = gateway(&closed_port().await);

    assert!(gw.fetch_pid_catalog().await.is_empty());
    assert!(gw.fetch_diagnostics().await.is_empty());
    assert!(matches!(gw.fetch_live_snapshot().await, Err(GatewayError::Connectivity(_))));
    assert!(matches!(gw.post_question("P0420").await, Err(GatewayError::Assistant(_))));
}

#[tokio::test]
async fn malformed_catalog_and_chat_are_handled() {
    let app = Router::new()
        .route("/api/obd/pids", get(|| async { Json(json!({ "supported": ["010C"] })) }))
        .route("/api/chat", post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }));
    let gw = gateway(&serve(app).await);

    assert!(gw.fetch_pid_catalog().await.is_empty());
    assert!(matches!(gw.post_question("P0420").await, Err(GatewayError::Assistant(_))));
}

#[tokio::test]
async fn null_fields_do_not_discard_the_payload() {
    let app = Router::new()
        .route(
            "/api/obd/pids",
            get(|| async { Json(json!({ "supported": { "010C": "Engine RPM", "010D": null } })) }),
        )
        .route(
            "/api/obd/diagnostics",
            get(|| async {
                Json(json!({ "dtcs": [
                    { "code": "P0420", "severity": "moyenne", "description": "Efficacité catalyseur" },
                    { "code": "P0171", "severity": null, "description": null }
                ]}))
            }),
        )
        .route(
            "/api/chat",
            post(|| async { Json(json!({ "answer": "Contrôler les fuites d'air", "tips": ["a", null] })) }),
        );
    let gw = gateway(&serve(app).await);

    let pids = gw.fetch_pid_catalog().await;
    assert_eq!(pids.len(), 2);
    assert_eq!(pids.get("010D").map(String::as_str), Some(""));

    let dtcs = gw.fetch_diagnostics().await;
    assert_eq!(dtcs.len(), 2);
    assert_eq!(dtcs[1].code, "P0171");
    assert_eq!(dtcs[1].severity, Severity::default());
    assert_eq!(dtcs[1].description, "");

    let reply = gw.post_question("P0171").await.unwrap();
    assert_eq!(reply.answer, "Contrôler les fuites d'air");
    assert_eq!(reply.tips, vec!["a"]);
}

//! HTTP client tests against an in-process axum model service.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use causalflow::api::{Backend, NodeDefinition, PriorModel};
use causalflow::{CausalFlowClient, ClientError, Config, Workbench};
use causalflow_core::{Edge, Estimator, EvidenceMap, Mode, Scoring};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

/// Request bodies seen by the mock, keyed by path.
#[derive(Clone, Default)]
struct Seen(Arc<Mutex<Vec<(String, Value)>>>);

impl Seen {
    fn record(&self, path: &str, body: Value) {
        self.0.lock().unwrap().push((path.to_string(), body));
    }

    fn body(&self, path: &str) -> Option<Value> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, b)| b.clone())
    }
}

async fn upload(State(seen): State<Seen>, mut multipart: Multipart) -> (StatusCode, Json<Value>) {
    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let text = String::from_utf8(field.bytes().await.unwrap().to_vec()).unwrap();
        seen.record("/upload_csv", json!({ "file_name": file_name }));

        let mut lines = text.lines();
        let Some(header) = lines.next().filter(|h| !h.trim().is_empty()) else {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "detail": "CSV file is empty" })),
            );
        };
        let columns: Vec<&str> = header.split(',').map(str::trim).collect();
        let rows: Vec<Vec<&str>> = lines
            .map(|l| l.split(',').map(str::trim).collect())
            .collect();
        let meta_info: serde_json::Map<String, Value> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let mut values: Vec<&str> = rows.iter().filter_map(|r| r.get(i).copied()).collect();
                values.sort_unstable();
                values.dedup();
                (c.to_string(), json!(values))
            })
            .collect();
        return (
            StatusCode::OK,
            Json(json!({
                "columns": columns,
                "meta_info": meta_info,
                "row_count": rows.len(),
                "column_count": columns.len(),
            })),
        );
    }
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "detail": [{ "loc": ["body", "file"], "msg": "field required" }] })),
    )
}

async fn validate(State(seen): State<Seen>, Json(body): Json<Value>) -> Json<Value> {
    seen.record("/validate_structure", body.clone());
    let edges: Vec<Edge> = serde_json::from_value(body["edges"].clone()).unwrap();
    let cyclic = edges
        .iter()
        .any(|e| edges.contains(&Edge::new(e.target.clone(), e.source.clone())));
    if cyclic {
        Json(json!({ "is_valid": false, "message": "Graph contains a cycle" }))
    } else {
        Json(json!({ "is_valid": true, "message": "Valid DAG" }))
    }
}

async fn learn_structure(State(seen): State<Seen>, Json(body): Json<Value>) -> Json<Value> {
    seen.record("/learn_structure", body);
    Json(json!({
        "edges": [
            { "source": "Rain", "target": "Sprinkler" },
            { "source": "Rain", "target": "Sprinkler" }
        ],
        "edge_count": 2
    }))
}

async fn learn_parameters(State(seen): State<Seen>, Json(body): Json<Value>) -> Json<Value> {
    seen.record("/learn_parameters", body);
    Json(json!({ "success": true, "message": "Model trained", "cpds": 2 }))
}

async fn build_from_priors(State(seen): State<Seen>, Json(body): Json<Value>) -> Json<Value> {
    seen.record("/build_from_priors", body);
    Json(json!({ "success": true }))
}

async fn infer(State(seen): State<Seen>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    seen.record("/infer", body.clone());
    let evidence: EvidenceMap = serde_json::from_value(body["evidence"].clone()).unwrap();
    if evidence.get("Rain").is_some_and(|s| s == "Maybe") {
        // Bare server error, no JSON detail.
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(Value::Null));
    }
    let on = match evidence.get("Rain").map(String::as_str) {
        Some("Yes") => 0.2,
        _ => 0.6,
    };
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "distributions": {
                "Sprinkler": { "On": on, "Off": 1.0 - on },
                "Ghost": { "a": 1.0 }
            }
        })),
    )
}

async fn add_node(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["name"] == "Reserved" {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "detail": "Node 'Reserved' already exists" })),
        );
    }
    (StatusCode::OK, Json(json!({ "node": body })))
}

/// Bind the mock on an ephemeral port and return its base URL.
async fn serve() -> (String, Seen) {
    let seen = Seen::default();
    let router = Router::new()
        .route("/", get(|| async { Json(json!({ "status": "ok" })) }))
        .route("/api/upload_csv", post(upload))
        .route("/api/validate_structure", post(validate))
        .route("/api/learn_structure", post(learn_structure))
        .route("/api/learn_parameters", post(learn_parameters))
        .route("/api/build_from_priors", post(build_from_priors))
        .route("/api/infer", post(infer))
        .route("/api/add_node", post(add_node))
        .with_state(seen.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{addr}"), seen)
}

const WEATHER: &str = "Rain,Sprinkler\nYes,Off\nNo,On\nNo,Off\n";

// =============================================================================
// CLIENT
// =============================================================================

#[tokio::test]
async fn test_health_hits_service_root() {
    let (base, _) = serve().await;
    let client = CausalFlowClient::new(&base, "/api");

    let status = client.health().await.unwrap();
    assert_eq!(status["status"], "ok");
}

#[tokio::test]
async fn test_upload_sends_multipart_file() {
    let (base, seen) = serve().await;
    let client = CausalFlowClient::new(&base, "/api");

    let import = client
        .upload_csv("weather.csv", WEATHER.as_bytes().to_vec())
        .await
        .unwrap();

    assert_eq!(import.columns, vec!["Rain", "Sprinkler"]);
    assert_eq!(import.row_count, 3);
    assert_eq!(import.meta_info["Rain"], vec!["No", "Yes"]);
    assert_eq!(
        seen.body("/upload_csv").unwrap()["file_name"],
        "weather.csv"
    );
}

#[tokio::test]
async fn test_string_detail_becomes_the_message() {
    let (base, _) = serve().await;
    let client = CausalFlowClient::new(&base, "/api");

    let err = client.upload_csv("empty.csv", Vec::new()).await.unwrap_err();
    assert_eq!(
        err,
        ClientError::Api {
            status: 400,
            detail: "CSV file is empty".to_string()
        }
    );
    assert_eq!(err.to_string(), "CSV file is empty");
}

#[tokio::test]
async fn test_missing_detail_uses_operation_fallback() {
    let (base, _) = serve().await;
    let client = CausalFlowClient::new(&base, "/api");

    let mut evidence = EvidenceMap::new();
    evidence.insert("Rain".to_string(), "Maybe".to_string());
    let err = client.infer(&evidence).await.unwrap_err();

    assert_eq!(err.to_string(), "Inference failed");
}

#[tokio::test]
async fn test_wire_shapes() {
    let (base, seen) = serve().await;
    let client = CausalFlowClient::new(&base, "api");
    let edges = vec![Edge::new("Rain", "Sprinkler")];

    client.learn_structure(Scoring::Bdeu).await.unwrap();
    assert_eq!(
        seen.body("/learn_structure").unwrap(),
        json!({ "scoring": "bdeu" })
    );

    let trained = client
        .learn_parameters(&edges, Estimator::Bayes)
        .await
        .unwrap();
    assert!(trained.success);
    assert_eq!(trained.extra["cpds"], 2);
    assert_eq!(
        seen.body("/learn_parameters").unwrap(),
        json!({
            "edges": [{ "source": "Rain", "target": "Sprinkler" }],
            "estimator": "bayes"
        })
    );

    let model = PriorModel {
        node_defs: vec![NodeDefinition {
            name: "Rain".to_string(),
            states: vec!["Yes".to_string(), "No".to_string()],
            prior: None,
        }],
        edges: Vec::new(),
    };
    client.build_from_priors(&model).await.unwrap();
    let sent = seen.body("/build_from_priors").unwrap();
    assert_eq!(sent["node_defs"][0]["name"], "Rain");
    assert_eq!(sent["edges"], json!([]));
}

#[tokio::test]
async fn test_add_node_conflict() {
    let (base, _) = serve().await;
    let client = CausalFlowClient::new(&base, "/api");
    let def = NodeDefinition {
        name: "Reserved".to_string(),
        states: vec!["a".to_string(), "b".to_string()],
        prior: None,
    };

    let err = client.add_node(&def).await.unwrap_err();
    assert_eq!(err.to_string(), "Node 'Reserved' already exists");
}

#[tokio::test]
async fn test_unreachable_service() {
    // Bind then drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = CausalFlowClient::new(format!("http://{addr}"), "/api");
    let err = client.health().await.unwrap_err();
    assert!(matches!(err, ClientError::Connection { .. }));
}

// =============================================================================
// END TO END
// =============================================================================

#[tokio::test]
async fn test_csv_to_posterior_over_http() {
    let (base, seen) = serve().await;
    let config = Config {
        base_url: base,
        ..Config::default()
    };
    let wb = Workbench::new(CausalFlowClient::from_config(&config), config);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weather.csv");
    std::fs::write(&path, WEATHER).unwrap();

    wb.import_csv(&path).await.unwrap();
    assert_eq!(wb.learn_structure(None).await.unwrap(), 1);
    assert_eq!(
        seen.body("/learn_structure").unwrap(),
        json!({ "scoring": "k2" })
    );

    wb.train(None).await.unwrap();
    assert_eq!(wb.mode().await, Mode::Trained);
    assert_eq!(seen.body("/infer").unwrap(), json!({ "evidence": {} }));
    // Distributions for nodes outside the graph are dropped.
    assert!(wb.distribution("Ghost").await.is_none());

    wb.toggle_evidence("Rain", "Yes").await.unwrap();
    assert_eq!(
        seen.body("/infer").unwrap(),
        json!({ "evidence": { "Rain": "Yes" } })
    );
    let sprinkler = wb.distribution("Sprinkler").await.unwrap();
    assert_eq!(sprinkler.get("On"), Some(0.2));
}

#[tokio::test]
async fn test_cycle_rejected_over_http() {
    let (base, seen) = serve().await;
    let config = Config {
        base_url: base,
        ..Config::default()
    };
    let wb = Workbench::new(CausalFlowClient::from_config(&config), config);

    wb.import_bytes("weather.csv", WEATHER.as_bytes().to_vec())
        .await
        .unwrap();
    wb.add_edge("Rain", "Sprinkler").await.unwrap();
    wb.add_edge("Sprinkler", "Rain").await.unwrap();

    let err = wb.train(None).await.unwrap_err();
    assert_eq!(err.to_string(), "Graph contains a cycle");
    assert_eq!(wb.mode().await, Mode::Building);
    assert!(seen.body("/learn_parameters").is_none());
}

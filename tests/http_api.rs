//! HTTP surface tests: the router driven with `oneshot` over the in-memory store.

mod helpers;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use helpers::{diamond, open_stale_replica_store, open_store, MemoryStore};
use roadgraph::server::router;

async fn app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(open_store().await);
    diamond(&store).await;
    (router(Arc::clone(&store)), store)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

// ---------------------------------------------------------------------------
// Probes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn probes_report_store_state() {
    let (app, store) = app().await;
    assert_eq!(get(&app, "/health").await.0, StatusCode::OK);
    assert_eq!(get(&app, "/ready").await.0, StatusCode::OK);

    store.handle().close();
    assert_eq!(get(&app, "/health").await.0, StatusCode::OK);
    assert_eq!(get(&app, "/ready").await.0, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = get(&app, "/intersections/1").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("not connected"));
}

// ---------------------------------------------------------------------------
// Intersections
// ---------------------------------------------------------------------------

#[tokio::test]
async fn intersection_crud() {
    let (app, _) = app().await;

    let (status, created) = send(
        &app,
        Method::POST,
        "/intersections",
        Some(json!({
            "coordinate": {"longitude": 14.3, "latitude": 40.9},
            "osmid": 50,
            "highway": "crossing",
            "ref": "X1",
            "hospital": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["osmid"], json!(50));
    assert_eq!(created["ref"], json!("X1"));
    assert_eq!(created["betweenness"], json!(0.0));

    let (status, updated) = send(
        &app,
        Method::PUT,
        "/intersections/50",
        Some(json!({"betweenness": 4.5})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["betweenness"], json!(4.5));

    let (_, hospitals) = get(&app, "/intersections/hospitals").await;
    assert_eq!(hospitals.as_array().map(Vec::len), Some(1));

    assert_eq!(
        send(&app, Method::DELETE, "/intersections/50", None).await.0,
        StatusCode::NO_CONTENT
    );
    let (status, body) = get(&app, "/intersections/50").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("intersection not found: 50"));
}

#[tokio::test]
async fn intersection_with_streets() {
    let (app, _) = app().await;

    let (status, body) = get(&app, "/intersections/1").await;
    assert_eq!(status, StatusCode::OK);
    let streets = body["streets"].as_object().unwrap();
    assert_eq!(streets.len(), 2);
    assert_eq!(streets["12"]["osmidDest"], json!(2));

    let (_, streets) = get(&app, "/intersections/4/streets").await;
    assert_eq!(streets, json!({}));
}

#[tokio::test]
async fn nearest_by_category() {
    let (app, _) = app().await;

    let (status, body) = get(&app, "/intersections/nearest?longitude=14.2511&latitude=40.8501").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["osmid"], json!(1));

    let (status, _) = get(
        &app,
        "/intersections/nearest?longitude=14.2511&latitude=40.8501&category=parking",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Streets
// ---------------------------------------------------------------------------

#[tokio::test]
async fn street_endpoints() {
    let (app, _) = app().await;

    let (status, street) = get(&app, "/streets?osmidStart=1&osmidDest=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(street["id"], json!(13));

    let (_, ids) = get(&app, "/streets").await;
    assert_eq!(ids, json!([12, 13, 24, 34]));

    let (status, _) = get(&app, "/streets?osmidStart=1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = send(&app, Method::PUT, "/streets/13", Some(json!({"weight": 0.25}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["weight"], json!(0.25));

    let (status, _) = send(
        &app,
        Method::PUT,
        "/streets/13/interrupted",
        Some(json!({"interrupted": true})),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(get(&app, "/streets/13").await.1["interrupted"], json!(true));
}

#[tokio::test]
async fn adding_a_street_to_a_missing_node_is_404() {
    let (app, _) = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/streets",
        Some(json!({"id": 77, "osmidStart": 1, "osmidDest": 999})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

// ---------------------------------------------------------------------------
// Centrality and routing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn critical_nodes_roundtrip() {
    let (app, _) = app().await;

    assert_eq!(get(&app, "/lastModified").await.0, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::PUT, "/criticalNodes?alg=exact", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["lastModified"].is_string());

    let (_, top) = get(&app, "/criticalNodes?top=1").await;
    assert_eq!(top[0]["osmid"], json!(2));

    let (_, above) = get(&app, "/criticalNodes?threshold=0.5").await;
    assert_eq!(above.as_array().map(Vec::len), Some(1));

    assert_eq!(get(&app, "/criticalNodes").await.0, StatusCode::BAD_REQUEST);
    assert_eq!(
        send(&app, Method::PUT, "/criticalNodes?alg=pagerank", None).await.0,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn refresh_reports_the_timestamp_written_on_the_primary() {
    let app = router(Arc::new(open_stale_replica_store().await));

    let (status, body) = send(&app, Method::PUT, "/criticalNodes?alg=exact", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["lastModified"].is_string());

    // the replica has not seen the marker yet
    assert_eq!(get(&app, "/lastModified").await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn shortest_paths_and_waiting_time() {
    let (app, _) = app().await;

    let (status, path) = get(&app, "/shortestPaths?osmidStart=1&osmidDest=4").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = path
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["osmid"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 4]);

    let (_, coords) = get(&app, "/shortestPaths?osmidStart=1&osmidDest=4&type=Coordinate").await;
    assert_eq!(coords.as_array().map(Vec::len), Some(4));
    assert!(coords[0]["longitude"].is_f64());

    send(
        &app,
        Method::PUT,
        "/streets/12/interrupted",
        Some(json!({"interrupted": true})),
    )
    .await;
    let (_, diverted) = get(&app, "/waitingTime?osmidStart=1&osmidDest=4").await;
    assert_eq!(diverted["distance"], json!(4.0));
    assert_eq!(diverted["waitingTime"], json!(0.1));

    let (_, ignoring) = get(&app, "/shortestPaths/ignoreInterrupted?osmidStart=1&osmidDest=4").await;
    assert_eq!(ignoring[1]["osmid"], json!(2));

    assert_eq!(
        get(&app, "/waitingTime?osmidStart=4&osmidDest=1").await.0,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn routes_between_positions_snap_to_nearest_intersections() {
    let (app, _) = app().await;
    let positions = "sourceLongitude=14.2511&sourceLatitude=40.8501\
                     &destinationLongitude=14.2539&destinationLatitude=40.8501";

    for route in ["integrationCC", "integrationEzBus"] {
        let (status, coords) = get(&app, &format!("/shortestPaths/{route}?{positions}")).await;
        assert_eq!(status, StatusCode::OK, "{route}");
        assert_eq!(coords.as_array().map(Vec::len), Some(4));
        assert!(coords[0]["longitude"].is_f64());
    }

    let (_, path) = get(
        &app,
        &format!("/shortestPaths/integrationCC?{positions}&type=Intersection"),
    )
    .await;
    assert_eq!(path[0]["osmid"], json!(1));
    assert_eq!(path[2]["osmid"], json!(4));

    let (status, body) = get(&app, &format!("/waitingTime?{positions}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["distance"], json!(2.0));
    assert_eq!(body["waitingTime"], json!(0.05));
}

#[tokio::test]
async fn positions_out_of_range_are_404() {
    let (app, _) = app().await;
    let far = "sourceLongitude=14.2511&sourceLatitude=40.8501\
               &destinationLongitude=15.5&destinationLatitude=41.5";

    let (status, body) = get(&app, &format!("/shortestPaths/integrationCC?{far}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("near (15.5, 41.5)"));
    assert_eq!(get(&app, &format!("/waitingTime?{far}")).await.0, StatusCode::NOT_FOUND);

    // mixing the two ways of naming endpoints
    let (status, _) = get(&app, "/waitingTime?osmidStart=1&sourceLongitude=14.25").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Malformed requests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_requests_use_the_error_body() {
    let (app, _) = app().await;

    let (status, body) = get(&app, "/intersections/not-a-number").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = get(&app, "/criticalNodes?top=many").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(
        &app,
        Method::POST,
        "/intersections",
        Some(json!({"osmid": "seven"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());

    let (status, body) = send(&app, Method::PUT, "/streets/12", Some(json!({"weight": -1.0}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("weight"));
}

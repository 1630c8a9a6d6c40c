//! JSON-over-HTTP surface for [`GraphStore`].

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

use crate::driver::Connector;
use crate::edges::street::{NewStreet, Street};
use crate::errors::RoadGraphError;
use crate::nodes::coordinate::Coordinate;
use crate::nodes::intersection::{Intersection, NewIntersection};
use crate::store::{CentralityAlgorithm, GraphStore};
use crate::utils::datetime::format_local_datetime;

/// Constant bus speed used by the travel-time estimate.
pub const BUS_SPEED: f64 = 40.0;

type Shared<C> = State<Arc<GraphStore<C>>>;
type ApiResult<T> = std::result::Result<T, ApiError>;

// ─── Errors ───────────────────────────────────────────────────────────────────

/// Failure rendered as `{"error": "..."}` with a matching status.
#[derive(Debug)]
pub enum ApiError {
    Store(RoadGraphError),
    /// Malformed path, query string or body.
    Rejected { status: StatusCode, message: String },
}

impl From<RoadGraphError> for ApiError {
    fn from(err: RoadGraphError) -> Self {
        Self::Store(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl ApiError {
    fn bad_request(msg: impl Into<String>) -> Self {
        Self::Store(RoadGraphError::Validation(msg.into()))
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Store(RoadGraphError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Store(RoadGraphError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Store(RoadGraphError::WriteConflict { .. }) => StatusCode::CONFLICT,
            Self::Store(e) if e.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Rejected { status, .. } => *status,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Store(err) => err.to_string(),
            Self::Rejected { message, .. } => message.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %message, "request failed");
        } else {
            debug!(status = status.as_u16(), error = %message, "request rejected");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

// ─── Extractors ───────────────────────────────────────────────────────────────
//
// Thin wrappers over axum's extractors whose rejections render as `ApiError`.

struct JsonBody<T>(T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

struct QueryParams<T>(T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

struct PathParam<T>(T);

impl<S, T> FromRequestParts<S> for PathParam<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

// ─── Parameter types ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EndpointsQuery {
    osmid_start: Option<i64>,
    osmid_dest: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PathQuery {
    osmid_start: i64,
    osmid_dest: i64,
    #[serde(rename = "type", default)]
    kind: PathKind,
}

/// Endpoints given as positions, each snapped to its nearest intersection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoordinatesQuery {
    source_longitude: f64,
    source_latitude: f64,
    destination_longitude: f64,
    destination_latitude: f64,
    /// Defaults to `Coordinate` on these routes.
    #[serde(rename = "type")]
    kind: Option<PathKind>,
}

/// Either `osmidStart`/`osmidDest` or the four coordinate parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WaitingQuery {
    osmid_start: Option<i64>,
    osmid_dest: Option<i64>,
    source_longitude: Option<f64>,
    source_latitude: Option<f64>,
    destination_longitude: Option<f64>,
    destination_latitude: Option<f64>,
}

impl WaitingQuery {
    fn positions(&self) -> Option<(Coordinate, Coordinate)> {
        Some((
            Coordinate::new(self.source_longitude?, self.source_latitude?),
            Coordinate::new(self.destination_longitude?, self.destination_latitude?),
        ))
    }
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
enum PathKind {
    Coordinate,
    #[default]
    Intersection,
}

#[derive(Debug, Deserialize)]
struct NearestQuery {
    longitude: f64,
    latitude: f64,
    #[serde(default)]
    category: NearestCategory,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum NearestCategory {
    #[default]
    Intersection,
    Parking,
    Hospital,
}

#[derive(Debug, Deserialize)]
struct CriticalQuery {
    top: Option<u32>,
    threshold: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct AlgorithmQuery {
    alg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BetweennessBody {
    betweenness: f64,
}

#[derive(Debug, Deserialize)]
struct WeightBody {
    weight: f64,
}

#[derive(Debug, Deserialize)]
struct InterruptedBody {
    interrupted: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LastModified {
    last_modified: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WaitingTime {
    distance: f64,
    waiting_time: f64,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// All routes, sharing one store.
pub fn router<C: Connector>(store: Arc<GraphStore<C>>) -> Router {
    Router::new()
        .route(
            "/intersections",
            get(list_intersections::<C>).post(add_intersection::<C>),
        )
        .route("/intersections/nearest", get(nearest::<C>))
        .route("/intersections/parkings", get(all_parkings::<C>))
        .route("/intersections/hospitals", get(all_hospitals::<C>))
        .route(
            "/intersections/{osmid}",
            get(get_intersection::<C>)
                .put(set_betweenness::<C>)
                .delete(delete_intersection::<C>),
        )
        .route("/intersections/{osmid}/streets", get(get_streets::<C>))
        .route("/streets", get(find_streets::<C>).post(add_street::<C>))
        .route(
            "/streets/{id}",
            get(get_street::<C>)
                .put(set_street_weight::<C>)
                .delete(delete_street::<C>),
        )
        .route("/streets/{id}/interrupted", put(set_street_interrupted::<C>))
        .route(
            "/criticalNodes",
            get(critical_nodes::<C>).put(update_betweenness::<C>),
        )
        .route("/lastModified", get(last_modified::<C>))
        .route("/shortestPaths", get(shortest_path::<C>))
        .route(
            "/shortestPaths/ignoreInterrupted",
            get(shortest_path_ignore_interrupted::<C>),
        )
        .route(
            "/shortestPaths/integrationCC",
            get(shortest_path_between_positions::<C>),
        )
        .route(
            "/shortestPaths/integrationEzBus",
            get(shortest_path_between_positions::<C>),
        )
        .route("/waitingTime", get(waiting_time::<C>))
        .route("/health", get(health))
        .route("/ready", get(ready::<C>))
        .with_state(store)
}

// ─── Intersections ────────────────────────────────────────────────────────────

async fn list_intersections<C: Connector>(State(store): Shared<C>) -> ApiResult<Json<Vec<i64>>> {
    Ok(Json(store.intersection_osmids().await?))
}

async fn add_intersection<C: Connector>(
    State(store): Shared<C>,
    JsonBody(req): JsonBody<NewIntersection>,
) -> ApiResult<Json<Intersection>> {
    Ok(Json(store.add_intersection(req).await?))
}

async fn get_intersection<C: Connector>(
    State(store): Shared<C>,
    PathParam(osmid): PathParam<i64>,
) -> ApiResult<Json<Intersection>> {
    Ok(Json(store.get_intersection(osmid).await?))
}

async fn set_betweenness<C: Connector>(
    State(store): Shared<C>,
    PathParam(osmid): PathParam<i64>,
    JsonBody(body): JsonBody<BetweennessBody>,
) -> ApiResult<Json<Intersection>> {
    Ok(Json(
        store
            .set_betweenness_intersection(osmid, body.betweenness)
            .await?,
    ))
}

async fn delete_intersection<C: Connector>(
    State(store): Shared<C>,
    PathParam(osmid): PathParam<i64>,
) -> ApiResult<StatusCode> {
    store.delete_intersection(osmid).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_streets<C: Connector>(
    State(store): Shared<C>,
    PathParam(osmid): PathParam<i64>,
) -> ApiResult<Json<BTreeMap<i64, Street>>> {
    Ok(Json(store.get_streets(osmid).await?))
}

async fn nearest<C: Connector>(
    State(store): Shared<C>,
    QueryParams(q): QueryParams<NearestQuery>,
) -> ApiResult<Json<Intersection>> {
    let position = Coordinate::new(q.longitude, q.latitude);
    let found = match q.category {
        NearestCategory::Intersection => store.nearest_intersection(position).await?,
        NearestCategory::Parking => store.nearest_parking(position).await?,
        NearestCategory::Hospital => store.nearest_hospital(position).await?,
    };
    found.map(Json).ok_or_else(|| {
        RoadGraphError::not_found(
            "intersection",
            format!("near ({}, {})", q.longitude, q.latitude),
        )
        .into()
    })
}

async fn all_parkings<C: Connector>(State(store): Shared<C>) -> ApiResult<Json<Vec<Intersection>>> {
    Ok(Json(store.all_parkings().await?))
}

async fn all_hospitals<C: Connector>(
    State(store): Shared<C>,
) -> ApiResult<Json<Vec<Intersection>>> {
    Ok(Json(store.all_hospitals().await?))
}

// ─── Streets ──────────────────────────────────────────────────────────────────

async fn add_street<C: Connector>(
    State(store): Shared<C>,
    JsonBody(req): JsonBody<NewStreet>,
) -> ApiResult<Json<Street>> {
    Ok(Json(store.add_street(req).await?))
}

/// `?osmidStart&osmidDest` → that street; no parameters → every street id.
async fn find_streets<C: Connector>(
    State(store): Shared<C>,
    QueryParams(q): QueryParams<EndpointsQuery>,
) -> ApiResult<Response> {
    match (q.osmid_start, q.osmid_dest) {
        (Some(start), Some(dest)) => {
            Ok(Json(store.get_street_between(start, dest).await?).into_response())
        }
        (None, None) => Ok(Json(store.street_ids().await?).into_response()),
        _ => Err(ApiError::bad_request(
            "osmidStart and osmidDest must be given together",
        )),
    }
}

async fn get_street<C: Connector>(
    State(store): Shared<C>,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<Street>> {
    Ok(Json(store.get_street(id).await?))
}

async fn set_street_weight<C: Connector>(
    State(store): Shared<C>,
    PathParam(id): PathParam<i64>,
    JsonBody(body): JsonBody<WeightBody>,
) -> ApiResult<Json<Street>> {
    Ok(Json(store.set_street_weight(id, body.weight).await?))
}

async fn set_street_interrupted<C: Connector>(
    State(store): Shared<C>,
    PathParam(id): PathParam<i64>,
    JsonBody(body): JsonBody<InterruptedBody>,
) -> ApiResult<StatusCode> {
    store.set_street_interrupted(id, body.interrupted).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_street<C: Connector>(
    State(store): Shared<C>,
    PathParam(id): PathParam<i64>,
) -> ApiResult<StatusCode> {
    store.delete_street(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Centrality ───────────────────────────────────────────────────────────────

async fn update_betweenness<C: Connector>(
    State(store): Shared<C>,
    QueryParams(q): QueryParams<AlgorithmQuery>,
) -> ApiResult<Json<LastModified>> {
    let algorithm: CentralityAlgorithm = q.alg.as_deref().unwrap_or_default().parse()?;
    let stamp = store.update_betweenness_with(algorithm).await?;
    Ok(Json(LastModified {
        last_modified: format_local_datetime(&stamp),
    }))
}

async fn critical_nodes<C: Connector>(
    State(store): Shared<C>,
    QueryParams(q): QueryParams<CriticalQuery>,
) -> ApiResult<Json<Vec<Intersection>>> {
    let nodes = match (q.top, q.threshold) {
        (Some(top), None) => store.top_critical_nodes(top).await?,
        (None, Some(threshold)) => store.threshold_critical_nodes(threshold).await?,
        _ => return Err(ApiError::bad_request("exactly one of top or threshold is required")),
    };
    Ok(Json(nodes))
}

async fn last_modified<C: Connector>(State(store): Shared<C>) -> ApiResult<Json<LastModified>> {
    let stamp = store.last_modified().await?;
    Ok(Json(LastModified {
        last_modified: format_local_datetime(&stamp),
    }))
}

// ─── Routing ──────────────────────────────────────────────────────────────────

async fn shortest_path<C: Connector>(
    State(store): Shared<C>,
    QueryParams(q): QueryParams<PathQuery>,
) -> ApiResult<Response> {
    Ok(match q.kind {
        PathKind::Intersection => Json(store.shortest_path(q.osmid_start, q.osmid_dest).await?)
            .into_response(),
        PathKind::Coordinate => Json(
            store
                .shortest_path_coordinates(q.osmid_start, q.osmid_dest)
                .await?,
        )
        .into_response(),
    })
}

async fn shortest_path_ignore_interrupted<C: Connector>(
    State(store): Shared<C>,
    QueryParams(q): QueryParams<PathQuery>,
) -> ApiResult<Response> {
    Ok(match q.kind {
        PathKind::Intersection => Json(
            store
                .shortest_path_ignore_interrupted(q.osmid_start, q.osmid_dest)
                .await?,
        )
        .into_response(),
        PathKind::Coordinate => Json(
            store
                .shortest_path_coordinates_ignore_interrupted(q.osmid_start, q.osmid_dest)
                .await?,
        )
        .into_response(),
    })
}

/// Interruption-aware path between the intersections nearest to two positions.
async fn shortest_path_between_positions<C: Connector>(
    State(store): Shared<C>,
    QueryParams(q): QueryParams<CoordinatesQuery>,
) -> ApiResult<Response> {
    let source = Coordinate::new(q.source_longitude, q.source_latitude);
    let destination = Coordinate::new(q.destination_longitude, q.destination_latitude);
    let (start, dest) = store.snap_endpoints(source, destination).await?;
    Ok(match q.kind.unwrap_or(PathKind::Coordinate) {
        PathKind::Intersection => Json(store.shortest_path(start, dest).await?).into_response(),
        PathKind::Coordinate => {
            Json(store.shortest_path_coordinates(start, dest).await?).into_response()
        }
    })
}

async fn waiting_time<C: Connector>(
    State(store): Shared<C>,
    QueryParams(q): QueryParams<WaitingQuery>,
) -> ApiResult<Json<WaitingTime>> {
    let (start, dest) = match (q.osmid_start, q.osmid_dest, q.positions()) {
        (Some(start), Some(dest), None) => (start, dest),
        (None, None, Some((source, destination))) => {
            store.snap_endpoints(source, destination).await?
        }
        _ => {
            return Err(ApiError::bad_request(
                "give either osmidStart and osmidDest or the source and destination coordinates",
            ))
        }
    };
    let distance = store
        .distance_shortest_path_bus(start, dest)
        .await?
        .ok_or_else(|| RoadGraphError::not_found("path", format!("{start}->{dest}")))?;
    Ok(Json(WaitingTime {
        distance,
        waiting_time: distance / BUS_SPEED,
    }))
}

// ─── Probes ───────────────────────────────────────────────────────────────────

/// Liveness probe. Returns 200 as long as the process is running.
async fn health() -> impl IntoResponse {
    StatusCode::OK
}

/// Readiness probe. Returns 200 if the read pool answers.
async fn ready<C: Connector>(State(store): Shared<C>) -> impl IntoResponse {
    match store.handle().ping().await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_statuses() {
        let cases = [
            (RoadGraphError::not_found("street", 1), StatusCode::NOT_FOUND),
            (RoadGraphError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (RoadGraphError::write_conflict("street", 1, 2), StatusCode::CONFLICT),
            (RoadGraphError::NotConnected, StatusCode::SERVICE_UNAVAILABLE),
            (RoadGraphError::Connection("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (RoadGraphError::decode("osmid", "missing"), StatusCode::INTERNAL_SERVER_ERROR),
            (RoadGraphError::Driver("syntax".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }
}

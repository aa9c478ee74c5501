use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Query, State},
    http::Method,
    routing::{get, on},
    Extension, Json, Router,
};
use model::{
    eta::{ArrivalEstimate, EtaResult},
    position::Coordinates,
    vehicle::Vehicle,
};
use serde::Deserialize;
use utility::id::Id;

use crate::{
    api::v1::positions,
    common::{
        route_not_found, schema_no_example, HateoasResult, RouteErrorResponse,
        VecResponse, METHOD_FILTER_ALL,
    },
    hateoas,
    middleware::base_url::BaseUrl,
    RouteResult, WebState,
};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/", get(estimate).post(estimate_batch))
        .route("/schema", get(schema_no_example::<EtaResult>))
        .route(
            "/batch/schema",
            get(schema_no_example::<VecResponse<ArrivalEstimate>>),
        )
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EstimateQuery {
    vehicle_id: Id<Vehicle>,
    latitude: f64,
    longitude: f64,
}

async fn estimate(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    State(WebState { client, .. }): State<WebState>,
    Query(params): Query<EstimateQuery>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<EtaResult> {
    let destination = Coordinates::new(params.latitude, params.longitude);
    let estimate = client
        .estimate_arrival(&params.vehicle_id, destination)
        .await
        .map_err(|why| {
            RouteErrorResponse::from(why).with_request(&method, &original_uri)
        })?;
    Ok(hateoas::Response::builder(estimate, base_url)
        .link("position", positions::resource!("/{}", params.vehicle_id))
        .build()
        .json())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BatchRequest {
    vehicle_ids: Vec<Id<Vehicle>>,
    destination: Coordinates,
}

async fn estimate_batch(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    State(WebState { client, .. }): State<WebState>,
    Json(request): Json<BatchRequest>,
) -> RouteResult<Json<VecResponse<ArrivalEstimate>>> {
    let estimates = client
        .estimate_arrival_many(request.vehicle_ids, request.destination)
        .await
        .map_err(|why| {
            RouteErrorResponse::from(why).with_request(&method, &original_uri)
        })?;
    Ok(VecResponse::new(estimates).json())
}

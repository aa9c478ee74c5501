use axum::{
    extract::{OriginalUri, State},
    http::{Method, StatusCode},
    routing::{on, post},
    Json, Router,
};
use model::vehicle::Vehicle;
use serde::Deserialize;
use tracking::events::CatalogEvent;
use utility::id::Id;

use crate::{
    common::{route_not_found, RouteErrorResponse, METHOD_FILTER_ALL},
    RouteResult, WebState,
};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/vehicle-removed", post(vehicle_removed))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VehicleRemoved {
    vehicle_id: Id<Vehicle>,
}

/// Called by the vehicle catalog once a vehicle is deleted. The reports of
/// the vehicle are removed in the background.
async fn vehicle_removed(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    State(WebState { events, .. }): State<WebState>,
    Json(removed): Json<VehicleRemoved>,
) -> RouteResult<StatusCode> {
    log::info!("vehicle {} was removed from the catalog", removed.vehicle_id);
    events
        .publish(CatalogEvent::VehicleRemoved(removed.vehicle_id))
        .await
        .map_err(|why| {
            RouteErrorResponse::from(why).with_request(&method, &original_uri)
        })?;
    Ok(StatusCode::ACCEPTED)
}

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Response,
    },
    routing::{get, on, post},
    Extension, Json, Router,
};
use axum_extra::TypedHeader;
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream};
use model::{
    live::{LatestPosition, LiveLocation, NearbyVehicle},
    position::{Coordinates, LocationView, PositionReport, RawPositionReport},
    route::Route,
    trail::Trail,
    vehicle::{Vehicle, VehicleStatus},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt as _;
use tracking::nearby::{NearbyQuery, DEFAULT_RADIUS_KM};
use utility::{
    id::Id,
    serde::{date_time, minutes},
};

use crate::{
    common::{
        route_not_found, schema, schema_no_example, HateoasResult, RouteErrorResponse,
        VecResponse, METHOD_FILTER_ALL,
    },
    conditional::Conditional,
    hateoas,
    middleware::base_url::BaseUrl,
    RouteResult, WebState,
};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/positions{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

/// Pause between two events of the live stream.
const STREAM_PERIOD: Duration = Duration::from_secs(10);

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/", post(submit))
        .route("/schema", get(schema::<PositionReport>))
        .route("/live", get(live))
        .route(
            "/live/schema",
            get(schema_no_example::<VecResponse<hateoas::Response<LiveLocation>>>),
        )
        .route("/live/stream", get(live_stream))
        .route("/nearby", get(nearby))
        .route("/nearby/schema", get(schema_no_example::<NearbyDto>))
        .route("/:vehicle_id", get(latest))
        .route("/:vehicle_id/trail", get(trail))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

// - ingest -

async fn submit(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    State(WebState { client, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(raw): Json<RawPositionReport>,
) -> RouteResult<(StatusCode, Json<hateoas::Response<LocationView>>)> {
    let stored = client.submit_position(raw).await.map_err(|why| {
        RouteErrorResponse::from(why).with_request(&method, &original_uri)
    })?;
    Ok((
        StatusCode::CREATED,
        location_hateoas(LocationView::new(&stored), base_url).json(),
    ))
}

// - single vehicle -

async fn latest(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    headers: HeaderMap,
    State(WebState { client, .. }): State<WebState>,
    Path(vehicle_id): Path<Id<Vehicle>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> RouteResult<Response> {
    let latest = client.latest_position(&vehicle_id).await.map_err(|why| {
        RouteErrorResponse::from(why).with_request(&method, &original_uri)
    })?;
    let last_modified = latest.location.timestamp;
    Ok(
        Conditional::json(&latest_hateoas(latest, base_url), Some(last_modified))?
            .respond(&headers),
    )
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrailQuery {
    #[serde(deserialize_with = "date_time::deserialize_utc_option", default)]
    start: Option<DateTime<Utc>>,

    #[serde(deserialize_with = "date_time::deserialize_utc_option", default)]
    end: Option<DateTime<Utc>>,

    limit: Option<usize>,
}

async fn trail(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    State(WebState { client, .. }): State<WebState>,
    Path(vehicle_id): Path<Id<Vehicle>>,
    Query(params): Query<TrailQuery>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<Trail> {
    let trail = client
        .trail(&vehicle_id, params.start, params.end, params.limit)
        .await
        .map_err(|why| {
            RouteErrorResponse::from(why).with_request(&method, &original_uri)
        })?;
    Ok(hateoas::Response::builder(trail, base_url)
        .link("self", resource!("/{}/trail", vehicle_id))
        .link("position", resource!("/{}", vehicle_id))
        .build()
        .json())
}

// - fleet -

async fn live(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    headers: HeaderMap,
    State(WebState { client, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> RouteResult<Response> {
    let locations = client.live_locations().await.map_err(|why| {
        RouteErrorResponse::from(why).with_request(&method, &original_uri)
    })?;
    let response = VecResponse::new(
        locations
            .into_iter()
            .map(|live| live_hateoas(live, base_url.clone()))
            .collect(),
    );
    Ok(Conditional::collection(&response)?.respond(&headers))
}

async fn live_stream(
    user_agent: Option<TypedHeader<headers::UserAgent>>,
    State(WebState { client, .. }): State<WebState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    match user_agent {
        Some(TypedHeader(user_agent)) => {
            log::debug!("`{}` subscribed to live locations", user_agent.as_str())
        }
        None => log::debug!("anonymous client subscribed to live locations"),
    }

    let stream = stream::unfold(client, |client| async move {
        let event = match client.live_locations().await {
            Ok(locations) => Event::default()
                .event("live")
                .json_data(VecResponse::new(locations))
                .unwrap_or_else(|why| Event::default().event("error").data(why.to_string())),
            Err(why) => {
                log::warn!("live stream update failed: {why}");
                Event::default().event("error").data(why.to_string())
            }
        };
        Some((event, client))
    })
    .map(Ok)
    .throttle(STREAM_PERIOD);

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NearbyParams {
    latitude: f64,

    longitude: f64,

    radius: Option<f64>,

    route_id: Option<Id<Route>>,

    status: Option<VehicleStatus>,

    limit: Option<usize>,

    /// Maximum report age in minutes.
    #[serde(deserialize_with = "minutes::deserialize_option", default)]
    window: Option<chrono::Duration>,
}

impl NearbyParams {
    fn query(self) -> NearbyQuery {
        let mut query = NearbyQuery::new(
            Coordinates::new(self.latitude, self.longitude),
            self.radius.unwrap_or(DEFAULT_RADIUS_KM),
        );
        query.route_id = self.route_id;
        query.status = self.status;
        query.limit = self.limit;
        query.window = self.window;
        query
    }
}

#[derive(Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct NearbyDto {
    latitude: f64,
    longitude: f64,
    radius: f64,
    vehicles: Vec<hateoas::Response<NearbyVehicle>>,
}

async fn nearby(
    method: Method,
    OriginalUri(original_uri): OriginalUri,
    headers: HeaderMap,
    State(WebState { client, .. }): State<WebState>,
    Query(params): Query<NearbyParams>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> RouteResult<Response> {
    let query = params.query();
    let (center, radius) = (query.center, query.radius_km);
    let vehicles = client.find_nearby(query).await.map_err(|why| {
        RouteErrorResponse::from(why).with_request(&method, &original_uri)
    })?;

    let dto = NearbyDto {
        latitude: center.latitude,
        longitude: center.longitude,
        radius,
        vehicles: vehicles
            .into_iter()
            .map(|nearby| nearby_hateoas(nearby, base_url.clone()))
            .collect(),
    };
    let response = hateoas::Response::builder(dto, base_url)
        .link(
            "self",
            resource!(
                "/nearby?latitude={}&longitude={}&radius={}",
                center.latitude,
                center.longitude,
                radius
            ),
        )
        .link("live", resource!("/live"))
        .build();
    Ok(Conditional::collection(&response)?.respond(&headers))
}

// - hateoas -

fn vehicle_links<T>(
    builder: hateoas::ResponseBuilder<T>,
    vehicle_id: &Id<Vehicle>,
) -> hateoas::ResponseBuilder<T> {
    builder
        .link("position", resource!("/{}", vehicle_id))
        .link("trail", resource!("/{}/trail", vehicle_id))
}

fn location_hateoas(
    location: LocationView,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<LocationView> {
    let vehicle_id = location.vehicle_id.clone();
    vehicle_links(hateoas::Response::builder(location, base_url), &vehicle_id).build()
}

fn latest_hateoas(
    latest: LatestPosition,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<LatestPosition> {
    let vehicle_id = latest.location.vehicle_id.clone();
    vehicle_links(hateoas::Response::builder(latest, base_url), &vehicle_id).build()
}

fn live_hateoas(
    live: LiveLocation,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<LiveLocation> {
    let vehicle_id = live.vehicle.id.clone();
    vehicle_links(hateoas::Response::builder(live, base_url), &vehicle_id).build()
}

fn nearby_hateoas(
    nearby: NearbyVehicle,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<NearbyVehicle> {
    let vehicle_id = nearby.vehicle.id.clone();
    vehicle_links(hateoas::Response::builder(nearby, base_url), &vehicle_id).build()
}

use axum::{routing::on, Router};

use crate::{
    common::{route_not_found, METHOD_FILTER_ALL},
    middleware::base_url::base_url_middleware,
    WebState,
};

mod arrivals;
mod events;
mod positions;

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::resource!("/v1{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .nest_service("/positions", positions::routes(state.clone()))
        .nest_service("/arrivals", arrivals::routes(state.clone()))
        .nest_service("/events", events::routes(state))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

pub use crate::common::RouteResult;

use axum::{extract::FromRef, Router};
use database::AnyDatabase;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracking::{client::Client, events::CatalogEvents};

pub mod api;
pub mod common;
pub mod conditional;
pub mod hateoas;
pub mod middleware;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

#[derive(Clone, FromRef)]
pub struct WebState {
    pub client: Client<AnyDatabase>,
    pub events: CatalogEvents,
}

pub async fn start_web_server(state: WebState, address: &str) -> std::io::Result<()> {
    let routes = Router::new()
        .nest_service("/api", api::routes(state))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(address).await?;
    log::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, routes.into_make_service()).await?;

    Ok(())
}

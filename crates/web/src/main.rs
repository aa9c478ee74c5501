use std::env;

use catalog::Catalogs;
use database::AnyDatabase;
use tracking::{config::TrackingConfig, server::Server};
use web::{start_web_server, WebState, DEFAULT_BIND_ADDRESS};

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = TrackingConfig::from_env();

    // storage
    let database = AnyDatabase::from_env(config.limits)
        .await
        .expect("could not connect to database.");

    // catalogs
    let catalogs = Catalogs::from_env().expect("could not load catalogs.");

    // server
    let server = Server::new(database, catalogs.vehicles, catalogs.routes, config);
    let background = server.start();

    // web server
    let address =
        env::var("WEB_BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_owned());
    let web_future = start_web_server(
        WebState {
            client: server.client(),
            events: background.events,
        },
        &address,
    );

    if let Err(why) = web_future.await {
        log::error!("web server stopped: {why}");
    }
}

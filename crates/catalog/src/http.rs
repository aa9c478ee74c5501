use async_trait::async_trait;
use model::{route::Route, vehicle::Vehicle};
use tracking::catalog::{CatalogError, CatalogResult, RouteCatalog, VehicleCatalog};
use utility::id::Id;

use crate::client::CatalogClient;

pub struct HttpVehicleCatalog {
    client: CatalogClient,
}

impl HttpVehicleCatalog {
    pub fn new(client: CatalogClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl VehicleCatalog for HttpVehicleCatalog {
    async fn get_vehicle(&self, id: &Id<Vehicle>) -> CatalogResult<Vehicle> {
        self.client
            .get(id.raw_ref::<str>())
            .await?
            .ok_or(CatalogError::NotFound)
    }
}

pub struct HttpRouteCatalog {
    client: CatalogClient,
}

impl HttpRouteCatalog {
    pub fn new(client: CatalogClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RouteCatalog for HttpRouteCatalog {
    async fn get_route(&self, id: &Id<Route>) -> CatalogResult<Route> {
        self.client
            .get(id.raw_ref::<str>())
            .await?
            .ok_or(CatalogError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use model::vehicle::VehicleStatus;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    use super::*;

    /// Answers one connection per canned response and returns the base url.
    async fn serve(responses: Vec<(u16, &'static str)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buffer = [0u8; 4096];
                let _ = socket.read(&mut buffer).await.unwrap();
                let response = format!(
                    "HTTP/1.1 {status} X\r\n\
                     content-type: application/json\r\n\
                     content-length: {}\r\n\
                     connection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
        });
        format!("http://{address}/vehicles/")
    }

    #[tokio::test]
    async fn maps_responses_to_catalog_results() {
        let vehicle = r#"{"registration":"NB-1234","capacity":54,"status":"active"}"#;
        let base_url = serve(vec![(200, vehicle), (404, ""), (500, "boom")]).await;
        let catalog = HttpVehicleCatalog::new(CatalogClient::new(base_url));

        let found = catalog.get_vehicle(&Id::from("bus-1")).await.unwrap();
        assert_eq!(found.status, VehicleStatus::Active);
        assert_eq!(found.registration, "NB-1234");

        assert!(matches!(
            catalog.get_vehicle(&Id::from("bus-2")).await,
            Err(CatalogError::NotFound)
        ));
        assert!(matches!(
            catalog.get_vehicle(&Id::from("bus-3")).await,
            Err(CatalogError::Other(_))
        ));
    }

    #[test]
    fn urls_join_base_and_id() {
        let client = CatalogClient::new("http://catalog.local/routes/");
        assert_eq!(client.url("138"), "http://catalog.local/routes/138");
    }
}

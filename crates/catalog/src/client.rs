use serde::Deserialize;

use crate::ApiError;

/// Reads single entities from a JSON catalog service laid out as
/// `{base_url}/{id}`.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    base_url: String,
    http: reqwest::Client,
}

impl CatalogClient {
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            http: reqwest::Client::new(),
        }
    }

    pub fn url(&self, id: &str) -> String {
        format!("{}/{}", self.base_url, id)
    }

    /// Fetch an entity by id. A 404 response yields `None`.
    pub async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        id: &str,
    ) -> Result<Option<T>, ApiError> {
        let url = self.url(id);
        log::debug!("Requesting '{url}'.");
        let response = self
            .http
            .get(&url)
            .header("accept", "application/json")
            .send()
            .await?;

        match response.status() {
            reqwest::StatusCode::OK => Ok(Some(response.json().await?)),
            reqwest::StatusCode::NOT_FOUND => Ok(None),
            other => match response.text().await {
                Ok(val) => Err(ApiError::InvalidResponse {
                    status_code: other,
                    url,
                    response: Some(val),
                }),
                Err(_) => Err(ApiError::InvalidResponse {
                    status_code: other,
                    url,
                    response: None,
                }),
            },
        }
    }
}

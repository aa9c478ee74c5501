use axum::{
    extract::{OriginalUri, Query, Request},
    http::{Method, StatusCode, Uri},
    response::IntoResponse,
    routing::MethodFilter,
    Json,
};
use model::ExampleData;
use schemars::{schema_for, schema_for_value, JsonSchema};
use serde::{Deserialize, Serialize};
use tracking::TrackingError;

use crate::hateoas;

pub type RouteResult<O> = Result<O, RouteErrorResponse>;
pub type HateoasResult<O> = RouteResult<Json<hateoas::Response<O>>>;

/// A `MethodFilter` that matches all http methods.
pub(crate) const METHOD_FILTER_ALL: MethodFilter = MethodFilter::GET
    .or(MethodFilter::POST)
    .or(MethodFilter::PATCH)
    .or(MethodFilter::PUT)
    .or(MethodFilter::DELETE);

#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VecResponse<T> {
    pub total_items: usize,
    pub data: Vec<T>,
}

impl<T> VecResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self {
            total_items: data.len(),
            data,
        }
    }

    pub fn json(self) -> Json<Self> {
        Json(self)
    }
}

// - Services returning commonly used responses -

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SchemaParams {
    #[serde(default = "Default::default")]
    example_data: bool,
}

pub(crate) async fn schema<T: ExampleData + JsonSchema + Serialize>(
    Query(params): Query<SchemaParams>,
) -> impl IntoResponse {
    if params.example_data {
        Json(schema_for_value!(T::example_data()))
    } else {
        Json(schema_for!(T))
    }
}

pub(crate) async fn schema_no_example<T: JsonSchema + Serialize>() -> impl IntoResponse
{
    Json(schema_for!(T))
}

pub(crate) async fn route_not_found(
    OriginalUri(original_uri): OriginalUri,
    req: Request,
) -> impl IntoResponse {
    RouteErrorResponse::not_found(req.method(), original_uri.path())
}

// - Commonly used responses -

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteErrorResponse {
    #[serde(skip)]
    pub status_code: StatusCode,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_uri: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed_information: Option<String>,
}

impl RouteErrorResponse {
    pub fn new(status_code: StatusCode) -> Self {
        Self {
            status_code,
            http_method: None,
            requested_uri: None,
            message: None,
            detailed_information: None,
        }
    }

    pub fn not_found(method: &Method, uri: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND)
            .with_method(method)
            .with_uri(uri)
            .with_default_message()
    }

    pub fn internal(why: impl ToString) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR)
            .with_default_message()
            .with_detailed_information(why.to_string())
    }

    pub fn with_method(mut self, method: &Method) -> Self {
        self.http_method = Some(method.to_string());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.requested_uri = Some(uri.into());
        self
    }

    /// Method and path of the request that failed.
    pub fn with_request(self, method: &Method, uri: &Uri) -> Self {
        self.with_method(method).with_uri(uri.path())
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_default_message(self) -> Self {
        let message = self
            .status_code
            .canonical_reason()
            .unwrap_or("i dunno what happened here :/");
        self.with_message(message)
    }

    pub fn with_detailed_information(mut self, message: impl Into<String>) -> Self {
        self.detailed_information = Some(message.into());
        self
    }
}

impl From<TrackingError> for RouteErrorResponse {
    fn from(value: TrackingError) -> Self {
        match value {
            TrackingError::Validation(why) => Self::new(StatusCode::BAD_REQUEST)
                .with_message("The request is invalid.")
                .with_detailed_information(why.to_string()),
            TrackingError::NotFound(what) => Self::new(StatusCode::NOT_FOUND)
                .with_message(format!("The requested {what} does not exist.")),
            TrackingError::OutOfRegion { .. } => Self::new(StatusCode::BAD_REQUEST)
                .with_message("The position is outside the operating region.")
                .with_detailed_information(value.to_string()),
            TrackingError::Timeout => {
                Self::new(StatusCode::GATEWAY_TIMEOUT).with_default_message()
            }
            TrackingError::StorageFault(why) => {
                log::error!("storage fault while handling a request: {why}");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR).with_default_message()
            }
        }
    }
}

impl IntoResponse for RouteErrorResponse {
    fn into_response(self) -> axum::response::Response {
        (self.status_code, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use model::ValidationError;

    use super::*;

    #[test]
    fn tracking_errors_map_to_status_codes() {
        let cases = [
            (
                TrackingError::Validation(ValidationError::new("heading", "out of range")),
                StatusCode::BAD_REQUEST,
            ),
            (
                TrackingError::NotFound("vehicle bus-1".to_owned()),
                StatusCode::NOT_FOUND,
            ),
            (
                TrackingError::OutOfRegion {
                    latitude: 51.5,
                    longitude: -0.12,
                },
                StatusCode::BAD_REQUEST,
            ),
            (TrackingError::Timeout, StatusCode::GATEWAY_TIMEOUT),
            (
                TrackingError::storage(std::io::Error::other("disk on fire")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status_code) in cases {
            assert_eq!(RouteErrorResponse::from(error).status_code, status_code);
        }
    }

    #[test]
    fn storage_faults_do_not_leak_details() {
        let response = RouteErrorResponse::from(TrackingError::storage(
            std::io::Error::other("password=hunter2"),
        ));
        let body = serde_json::to_string(&response).unwrap();
        assert!(!body.contains("hunter2"));
    }

    #[test]
    fn not_found_names_the_missing_item() {
        let response =
            RouteErrorResponse::from(TrackingError::NotFound("vehicle bus-9".to_owned()));
        assert_eq!(
            response.message.as_deref(),
            Some("The requested vehicle bus-9 does not exist.")
        );
    }
}

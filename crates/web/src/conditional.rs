use std::time::SystemTime;

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use headers::{ETag, HeaderMapExt, IfModifiedSince, IfNoneMatch, LastModified};
use serde::Serialize;
use xxhash_rust::xxh3::xxh3_64;

use crate::{common::RouteErrorResponse, RouteResult};

/// A serialized JSON body with the validators clients use for conditional
/// requests: an `ETag` fingerprint of the body and the capture time of the
/// newest report it contains.
#[derive(Debug, Clone)]
pub struct Conditional {
    body: Vec<u8>,
    etag: ETag,
    last_modified: Option<SystemTime>,
}

impl Conditional {
    /// Validators for a collection. Entries may leave a collection without
    /// anything newer entering it, so only the fingerprint validates.
    pub fn collection<T: Serialize>(content: &T) -> RouteResult<Self> {
        Self::json(content, None)
    }

    pub fn json<T: Serialize>(
        content: &T,
        last_modified: Option<DateTime<Utc>>,
    ) -> RouteResult<Self> {
        let body = serde_json::to_vec(content).map_err(RouteErrorResponse::internal)?;
        let etag = format!("\"{:016x}\"", xxh3_64(&body))
            .parse::<ETag>()
            .map_err(|_| RouteErrorResponse::internal("invalid entity tag"))?;
        Ok(Self {
            body,
            etag,
            last_modified: last_modified.map(SystemTime::from),
        })
    }

    /// `If-None-Match` wins over `If-Modified-Since` when both are sent.
    pub fn is_fresh(&self, request_headers: &HeaderMap) -> bool {
        if let Some(if_none_match) = request_headers.typed_get::<IfNoneMatch>() {
            return !if_none_match.precondition_passes(&self.etag);
        }
        match (
            request_headers.typed_get::<IfModifiedSince>(),
            self.last_modified,
        ) {
            (Some(if_modified_since), Some(last_modified)) => {
                !if_modified_since.is_modified(last_modified)
            }
            _ => false,
        }
    }

    /// `304 Not Modified` without a body when the client's copy is fresh,
    /// `200 OK` with the body otherwise.
    pub fn respond(self, request_headers: &HeaderMap) -> Response {
        let fresh = self.is_fresh(request_headers);
        let mut response = if fresh {
            StatusCode::NOT_MODIFIED.into_response()
        } else {
            (
                [(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                )],
                self.body,
            )
                .into_response()
        };
        let headers = response.headers_mut();
        headers.typed_insert(self.etag);
        if let Some(last_modified) = self.last_modified {
            headers.typed_insert(LastModified::from(last_modified));
        }
        response
    }
}

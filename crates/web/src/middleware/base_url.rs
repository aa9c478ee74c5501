use axum::{extract, http::HeaderMap, middleware::Next, response::IntoResponse};
use std::sync::Arc;

/// Scheme, host and path prefix under which clients reach the service,
/// honoring reverse proxy headers.
#[derive(Debug, Clone)]
pub struct BaseUrl {
    proto: String,
    host: String,
    prefix: String,
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

impl BaseUrl {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let proto = header(headers, "x-forwarded-proto")
            .unwrap_or("http")
            .to_string();

        let host = header(headers, "x-forwarded-host")
            .or_else(|| header(headers, "host"))
            .unwrap_or("localhost")
            .to_string();

        let prefix = header(headers, "x-forwarded-prefix")
            .unwrap_or("")
            .trim_end_matches('/')
            .to_string();

        BaseUrl {
            proto,
            host,
            prefix,
        }
    }

    pub fn full_url<S: Into<String>>(&self, path: S) -> String {
        format!(
            "{}://{}{}{}",
            self.proto,
            self.host,
            self.prefix,
            path.into()
        )
    }
}

pub async fn base_url_middleware(
    mut req: extract::Request,
    next: Next,
) -> impl IntoResponse {
    let base_url = BaseUrl::from_headers(req.headers());
    req.extensions_mut().insert(Arc::new(base_url));
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_headers_take_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert("host", "10.0.0.7:8080".parse().unwrap());
        headers.insert("x-forwarded-proto", "https".parse().unwrap());
        headers.insert("x-forwarded-host", "buses.example.lk".parse().unwrap());
        headers.insert("x-forwarded-prefix", "/tracking/".parse().unwrap());

        assert_eq!(
            BaseUrl::from_headers(&headers).full_url("/api/ping"),
            "https://buses.example.lk/tracking/api/ping"
        );
    }

    #[test]
    fn falls_back_to_localhost() {
        assert_eq!(
            BaseUrl::from_headers(&HeaderMap::new()).full_url("/api/ping"),
            "http://localhost/api/ping"
        );
    }
}

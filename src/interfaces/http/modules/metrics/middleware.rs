//! Request counters for the places API

use std::time::Instant;

use axum::{body::Body, extract::MatchedPath, http::Request, middleware::Next, response::Response};

/// Label used for requests that matched no route (404s, static files).
const UNMATCHED_ROUTE: &str = "unmatched";

fn route_label(request: &Request<Body>) -> String {
    match request.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_owned(),
        None => UNMATCHED_ROUTE.to_owned(),
    }
}

/// Counts requests in `http_requests_total{method,path,status}` and times
/// them in `http_request_duration_seconds{method,path}`.
///
/// `path` is the route template (`/api/places/{place_id}`), never the raw URI.
pub async fn http_metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let route = route_label(&request);
    let method = request.method().as_str().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;

    let elapsed = started.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();
    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.clone(),
        "path" => route.clone()
    )
    .record(elapsed);
    metrics::counter!(
        "http_requests_total",
        "method" => method,
        "path" => route,
        "status" => status
    )
    .increment(1);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_label_without_matched_path() {
        let request = Request::get("/api/places/p1").body(Body::empty()).unwrap();
        assert_eq!(route_label(&request), UNMATCHED_ROUTE);
    }
}

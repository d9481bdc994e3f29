use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

use crate::telemetry::CustodyMetrics;

/// Records the duration and status of every request served by the API.
pub async fn track_server_metrics(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();

    let start = Instant::now();
    let response = next.run(req).await;

    CustodyMetrics::observe_http_request(start.elapsed(), path, response.status().as_str().to_string());

    response
}

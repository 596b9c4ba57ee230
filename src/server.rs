//! Local HTTP front end for the dashboard.
//!
//! Every page load re-runs the full pipeline:
//! - GET /          - dashboard page
//! - GET /refresh   - same page, explicit user refresh
//! - GET /api/dashboard - the refreshed view as JSON
//! - GET /health    - liveness probe

use crate::config::DashboardConfig;
use crate::errors::{AppError, AppResult};
use crate::render::render_page;
use crate::show_dashboard;
use tiny_http::{Header, Method, Request, Response, Server};

const VERSION: &str = env!("CARGO_PKG_VERSION");

type HttpResponse = Response<std::io::Cursor<Vec<u8>>>;

/// Serve until the listener shuts down. Requests are handled one at a time.
pub fn serve(config: &DashboardConfig) -> AppResult<()> {
    let server = Server::http(&config.bind)
        .map_err(|err| AppError::Io(format!("failed to bind {}: {}", config.bind, err)))?;
    tracing::info!(bind = %config.bind, "dashboard listening");

    for request in server.incoming_requests() {
        if let Err(error) = handle_request(request, config) {
            tracing::warn!(error = %error, "failed to answer request");
        }
    }

    Ok(())
}

fn handle_request(request: Request, config: &DashboardConfig) -> AppResult<()> {
    let path = request.url().split('?').next().unwrap_or("").to_string();
    let method = request.method().clone();
    tracing::debug!(method = %method, path = %path, "request");

    let response = route(&method, &path, config)?;
    request.respond(response).map_err(AppError::from)
}

fn route(method: &Method, path: &str, config: &DashboardConfig) -> AppResult<HttpResponse> {
    match (method, path) {
        (Method::Get, "/") | (Method::Get, "/refresh") => {
            let view = show_dashboard(config);
            Ok(with_content_type(
                Response::from_string(render_page(&view)),
                "text/html; charset=utf-8",
            ))
        }
        (Method::Get, "/api/dashboard") => {
            let view = show_dashboard(config);
            json_response(200, &serde_json::to_value(&view)?)
        }
        (Method::Get, "/health") => json_response(200, &serde_json::json!({ "status": "ok", "version": VERSION })),
        _ => json_response(404, &serde_json::json!({ "error": "not found" })),
    }
}

fn json_response(status: u16, body: &serde_json::Value) -> AppResult<HttpResponse> {
    let response = Response::from_string(serde_json::to_string(body)?).with_status_code(status);
    Ok(with_content_type(response, "application/json"))
}

fn with_content_type(response: HttpResponse, content_type: &str) -> HttpResponse {
    match Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes()) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

#[cfg(test)]
mod tests {
    use super::route;
    use crate::config::DashboardConfig;
    use std::io::Read;
    use tiny_http::Method;

    fn body(response: super::HttpResponse) -> String {
        let mut text = String::new();
        response.into_reader().read_to_string(&mut text).expect("read body");
        text
    }

    fn empty_config() -> (tempfile::TempDir, DashboardConfig) {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = DashboardConfig {
            search_root: dir.path().join(".trackio"),
            ..DashboardConfig::default()
        };
        (dir, config)
    }

    #[test]
    fn health_reports_ok() {
        let (_dir, config) = empty_config();
        let response = route(&Method::Get, "/health", &config).expect("route");
        assert_eq!(response.status_code().0, 200);
        assert!(body(response).contains("\"status\":\"ok\""));
    }

    #[test]
    fn refresh_renders_page_without_data() {
        let (_dir, config) = empty_config();
        let response = route(&Method::Get, "/refresh", &config).expect("route");
        assert_eq!(response.status_code().0, 200);
        let page = body(response);
        assert!(page.contains("no data found"));
        assert!(page.contains("Q8 F1 Score"));
    }

    #[test]
    fn api_returns_json_view() {
        let (_dir, config) = empty_config();
        let response = route(&Method::Get, "/api/dashboard", &config).expect("route");
        let value: serde_json::Value = serde_json::from_str(&body(response)).expect("json");
        assert_eq!(value["status"], "no data found");
        assert_eq!(value["cards"][0]["stats"]["epochCount"], 0);
    }

    #[test]
    fn unknown_path_is_not_found() {
        let (_dir, config) = empty_config();
        let response = route(&Method::Post, "/", &config).expect("route");
        assert_eq!(response.status_code().0, 404);
    }
}

//! Request ID middleware: generates or extracts a correlation ID for every
//! ingest/admin request, attaches it to the request's extensions as a
//! [`RequestContext`], and echoes it back on the response.

use axum::{
    extract::Request,
    http::{header::HeaderValue, HeaderName, StatusCode},
    middleware::Next,
    response::Response,
};
use erp_core::error::RequestContext;
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Generates or extracts a request ID, builds a [`RequestContext`], and
/// inserts it into the request's extensions for downstream handlers.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Result<Response, StatusCode> {
    let request_id = extract_or_generate_request_id(&request);

    let mut context = RequestContext::new().with_request_id(request_id.clone());
    if let Some(ip) = extract_client_ip(&request) {
        context = context.with_source_ip(ip);
    }

    request.extensions_mut().insert(context);

    let mut response = next.run(request).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_str(REQUEST_ID_HEADER).unwrap(), header_value);
    }

    debug!(request_id = %request_id, status = %response.status(), "request completed");

    Ok(response)
}

fn extract_or_generate_request_id(request: &Request) -> String {
    for header_name in [REQUEST_ID_HEADER, "x-correlation-id", "x-trace-id"] {
        if let Some(value) = request.headers().get(header_name) {
            if let Ok(id_str) = value.to_str() {
                if is_valid_request_id(id_str) {
                    return id_str.to_string();
                }
            }
        }
    }
    Uuid::new_v4().to_string()
}

fn extract_client_ip(request: &Request) -> Option<String> {
    for header_name in ["x-forwarded-for", "x-real-ip", "cf-connecting-ip", "x-client-ip"] {
        if let Some(value) = request.headers().get(header_name) {
            if let Ok(ip_str) = value.to_str() {
                let ip = if header_name == "x-forwarded-for" {
                    ip_str.split(',').next().unwrap_or(ip_str).trim()
                } else {
                    ip_str.trim()
                };
                if is_valid_ip(ip) {
                    return Some(ip.to_string());
                }
            }
        }
    }
    None
}

fn is_valid_request_id(id: &str) -> bool {
    if Uuid::from_str(id).is_ok() {
        return true;
    }
    id.len() >= 8
        && id.len() <= 128
        && id.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

fn is_valid_ip(ip: &str) -> bool {
    ip.parse::<std::net::IpAddr>().is_ok()
}

/// Extension trait for convenient request ID lookup in handlers.
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&str>;
    fn request_context(&self) -> Option<&RequestContext>;
}

impl RequestIdExt for Request {
    fn request_id(&self) -> Option<&str> {
        self.extensions().get::<RequestContext>().map(|ctx| ctx.request_id.as_str())
    }

    fn request_context(&self) -> Option<&RequestContext> {
        self.extensions().get::<RequestContext>()
    }
}

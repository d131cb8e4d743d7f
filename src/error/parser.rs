use serde_json::Value;
use super::upstream_error::UpstreamError;

pub fn parse_http_error(status: u16, body: &str, context: ErrorContext) -> UpstreamError {
    let message = extract_message(body);
    let code = extract_code(body);
    let resource = context.resource.clone().unwrap_or_else(|| "resource".to_string());

    match status {
        401 => UpstreamError::AuthenticationFailed {
            reason: message.unwrap_or_else(|| "Invalid API key".to_string()),
        },

        403 => UpstreamError::AccessDenied {
            resource,
            message: message.unwrap_or_default(),
        },

        404 => UpstreamError::NotFound { resource },

        408 | 504 => UpstreamError::Timeout {
            operation: context.operation.unwrap_or_else(|| resource.clone()),
        },

        429 => UpstreamError::RateLimited {
            retry_after_secs: context.retry_after_secs.unwrap_or(60),
        },

        // PostgREST reports privilege errors as 400/401 with SQLSTATE 42501
        _ if code.as_deref() == Some("42501") => UpstreamError::AccessDenied {
            resource,
            message: message.unwrap_or_default(),
        },

        // PGRST202: function not found in the schema cache
        _ if code.as_deref() == Some("PGRST202") || code.as_deref() == Some("42883") => {
            UpstreamError::NotFound { resource }
        }

        500..=599 => UpstreamError::Server {
            status,
            message: message.unwrap_or_else(|| body.trim().to_string()),
        },

        _ => UpstreamError::Unknown {
            code: code.or_else(|| Some(format!("HTTP_{}", status))),
            message: message.unwrap_or_else(|| body.trim().to_string()),
        },
    }
}

pub fn from_reqwest(error: reqwest::Error, context: ErrorContext) -> UpstreamError {
    let operation = context
        .operation
        .or(context.resource)
        .unwrap_or_else(|| "request".to_string());

    if error.is_timeout() {
        UpstreamError::Timeout { operation }
    } else if error.is_connect() || error.is_request() {
        UpstreamError::ConnectionFailed { reason: error.to_string() }
    } else if error.is_decode() || error.is_body() {
        UpstreamError::InvalidResponse { operation, reason: error.to_string() }
    } else {
        UpstreamError::Unknown { code: None, message: error.to_string() }
    }
}

/// Pull a human readable message out of a PostgREST or GoTrue error body.
fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

fn extract_code(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["code", "error_code"]
        .iter()
        .find_map(|key| match value.get(*key) {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        })
}

#[derive(Debug, Default, Clone)]
pub struct ErrorContext {
    pub operation: Option<String>,
    pub resource: Option<String>,
    pub retry_after_secs: Option<u64>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation(mut self, op: impl Into<String>) -> Self {
        self.operation = Some(op.into());
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_retry_after(mut self, secs: Option<u64>) -> Self {
        self.retry_after_secs = secs;
        self
    }
}

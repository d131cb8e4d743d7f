use std::fmt;

#[derive(Debug, Clone)]
pub enum UpstreamError {
    AuthenticationFailed {
        reason: String,
    },

    AccessDenied {
        resource: String,
        message: String,
    },

    NotFound {
        resource: String,
    },

    RateLimited {
        retry_after_secs: u64,
    },

    ConnectionFailed {
        reason: String,
    },

    Timeout {
        operation: String,
    },

    InvalidResponse {
        operation: String,
        reason: String,
    },

    Server {
        status: u16,
        message: String,
    },

    Unknown {
        code: Option<String>,
        message: String,
    },
}

impl UpstreamError {
    pub fn suggestion(&self) -> String {
        match self {
            UpstreamError::AuthenticationFailed { .. } => {
                "Try:\n  \
                 • Copy the service_role key from Project Settings → API\n  \
                 • Make sure the key belongs to the project at SUPABASE_URL\n  \
                 • Check that the key has not been rotated".to_string()
            }

            UpstreamError::AccessDenied { resource, .. } => {
                format!(
                    "Access to {resource} was refused:\n  \
                     • Use a service_role key, not the anon key\n  \
                     • Check that the introspection functions are granted to service_role"
                )
            }

            UpstreamError::NotFound { resource } => {
                format!(
                    "{resource} does not exist:\n  \
                     • Create the get_public_tables and check_rls_enabled functions\n  \
                     • Verify SUPABASE_URL points at the right project\n  \
                     • Reload the PostgREST schema cache"
                )
            }

            UpstreamError::RateLimited { retry_after_secs } => {
                format!(
                    "Rate limited:\n  \
                     • Wait {retry_after_secs}s and retry\n  \
                     • Lower --max-concurrency for large schemas"
                )
            }

            UpstreamError::Timeout { operation } => {
                format!(
                    "Operation '{operation}' timed out:\n  \
                     • Raise request_timeout_secs\n  \
                     • Check the project is not paused"
                )
            }

            UpstreamError::ConnectionFailed { .. } => {
                "Connection failed:\n  \
                 • Check your internet connection\n  \
                 • Verify SUPABASE_URL\n  \
                 • Try again in a few moments".to_string()
            }

            UpstreamError::InvalidResponse { .. } => {
                "Unexpected response shape:\n  \
                 • Check the introspection functions return the documented columns\n  \
                 • Run with --verbose to see the failing operation".to_string()
            }

            UpstreamError::Server { .. } | UpstreamError::Unknown { .. } => {
                "An unexpected error occurred:\n  \
                 • Check the error message for details\n  \
                 • Check Supabase status: https://status.supabase.com/".to_string()
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            UpstreamError::AuthenticationFailed { .. } => "AUTH_FAILED",
            UpstreamError::AccessDenied { .. } => "ACCESS_DENIED",
            UpstreamError::NotFound { .. } => "NOT_FOUND",
            UpstreamError::RateLimited { .. } => "RATE_LIMITED",
            UpstreamError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            UpstreamError::Timeout { .. } => "TIMEOUT",
            UpstreamError::InvalidResponse { .. } => "INVALID_RESPONSE",
            UpstreamError::Server { .. } => "SERVER_ERROR",
            UpstreamError::Unknown { .. } => "UNKNOWN",
        }
    }

    /// The upstream's own message, without our prefix.
    pub fn detail(&self) -> String {
        match self {
            UpstreamError::AuthenticationFailed { reason }
            | UpstreamError::ConnectionFailed { reason } => reason.clone(),
            UpstreamError::AccessDenied { message, .. }
            | UpstreamError::Server { message, .. }
            | UpstreamError::Unknown { message, .. } if !message.is_empty() => message.clone(),
            UpstreamError::InvalidResponse { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }

    /// Failures worth another attempt under a retry policy.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            UpstreamError::RateLimited { .. }
                | UpstreamError::ConnectionFailed { .. }
                | UpstreamError::Timeout { .. }
                | UpstreamError::Server { .. }
        )
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamError::AuthenticationFailed { reason } => {
                write!(f, "Authentication failed: {reason}")
            }

            UpstreamError::AccessDenied { resource, message } => {
                write!(f, "Access denied to {resource}")?;
                if !message.is_empty() {
                    write!(f, ": {message}")?;
                }
                Ok(())
            }

            UpstreamError::NotFound { resource } => {
                write!(f, "Not found: {resource}")
            }

            UpstreamError::RateLimited { retry_after_secs } => {
                write!(f, "Rate limited (retry after {retry_after_secs}s)")
            }

            UpstreamError::ConnectionFailed { reason } => {
                write!(f, "Connection failed: {reason}")
            }

            UpstreamError::Timeout { operation } => {
                write!(f, "Timeout during {operation}")
            }

            UpstreamError::InvalidResponse { operation, reason } => {
                write!(f, "Invalid response from {operation}: {reason}")
            }

            UpstreamError::Server { status, message } => {
                write!(f, "Server error ({status}): {message}")
            }

            UpstreamError::Unknown { code, message } => {
                if let Some(c) = code {
                    write!(f, "Upstream error [{c}]: {message}")
                } else {
                    write!(f, "Upstream error: {message}")
                }
            }
        }
    }
}

impl std::error::Error for UpstreamError {}

//! Categorization of AWS SDK errors raised by ElastiCache calls.
//!
//! The ElastiCache client surfaces failures as `anyhow::Error` wrapping the SDK's
//! `SdkError`. Their rendered text is matched against the known AWS error codes to
//! separate transient failures (throttling, timeouts, network, service outages), which
//! the retry helper may try again, from permanent ones (permissions, bad parameters,
//! missing credentials).

use std::time::Duration;

/// Categorized error types for AWS SDK errors
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorCategory {
    /// Request was throttled due to rate limiting
    Throttled {
        error_code: String,
        retry_after: Option<Duration>,
    },
    /// Request timed out
    Timeout { operation: String },
    /// Network connectivity issues
    NetworkError { message: String },
    /// AWS service temporarily unavailable
    ServiceUnavailable { message: String },
    /// No credentials could be resolved for the profile
    MissingCredentials { message: String },
    /// Non-retryable error (permissions, validation, etc.)
    NonRetryable {
        code: String,
        message: String,
        is_permission_error: bool,
    },
}

impl ErrorCategory {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCategory::Throttled { .. }
                | ErrorCategory::Timeout { .. }
                | ErrorCategory::NetworkError { .. }
                | ErrorCategory::ServiceUnavailable { .. }
        )
    }

    /// Short label for log lines
    pub fn short_label(&self) -> &'static str {
        match self {
            ErrorCategory::Throttled { .. } => "throttled",
            ErrorCategory::Timeout { .. } => "timeout",
            ErrorCategory::NetworkError { .. } => "network",
            ErrorCategory::ServiceUnavailable { .. } => "unavailable",
            ErrorCategory::MissingCredentials { .. } => "credentials",
            ErrorCategory::NonRetryable { .. } => "error",
        }
    }
}

/// Categorize an error returned by an ElastiCache call.
///
/// The `Debug` rendering is used when the display text is the SDK's generic
/// "service error", since only the debug form carries the error code.
pub fn categorize_error(error: &anyhow::Error, operation: &str) -> ErrorCategory {
    let error_str = format!("{:#}", error);

    if error_str.contains("service error") {
        categorize_error_string(&format!("{:?}", error), operation)
    } else {
        categorize_error_string(&error_str, operation)
    }
}

pub fn categorize_error_string(error_str: &str, operation: &str) -> ErrorCategory {
    if error_str.contains("Throttling")
        || error_str.contains("RequestLimitExceeded")
        || error_str.contains("TooManyRequestsException")
        || error_str.contains("RateExceeded")
    {
        let error_code = extract_error_code(error_str).unwrap_or_else(|| "Throttling".to_string());
        return ErrorCategory::Throttled {
            error_code,
            retry_after: None,
        };
    }

    // Checked before the network patterns: "no credentials" messages mention the provider chain
    if error_str.contains("CredentialsNotLoaded")
        || error_str.contains("NoCredentials")
        || error_str.contains("no credentials")
        || error_str.contains("failed to load credentials")
    {
        return ErrorCategory::MissingCredentials {
            message: truncate_message(error_str, 200),
        };
    }

    if error_str.contains("TimeoutError")
        || error_str.contains("timeout")
        || error_str.contains("timed out")
    {
        return ErrorCategory::Timeout {
            operation: operation.to_string(),
        };
    }

    if error_str.contains("DispatchFailure")
        || error_str.contains("connection")
        || error_str.contains("Connection")
        || error_str.contains("dns error")
        || error_str.contains("DNS")
        || error_str.contains("socket")
    {
        return ErrorCategory::NetworkError {
            message: truncate_message(error_str, 100),
        };
    }

    if error_str.contains("ServiceUnavailable")
        || error_str.contains("InternalServerError")
        || error_str.contains("InternalFailure")
        || error_str.contains("Service Unavailable")
    {
        return ErrorCategory::ServiceUnavailable {
            message: truncate_message(error_str, 100),
        };
    }

    let is_permission_error = error_str.contains("AccessDenied")
        || error_str.contains("UnauthorizedOperation")
        || error_str.contains("InvalidClientTokenId")
        || error_str.contains("ExpiredToken")
        || error_str.contains("SignatureDoesNotMatch");

    let code = extract_error_code(error_str).unwrap_or_else(|| {
        if is_permission_error {
            "AccessDenied".to_string()
        } else {
            "Unknown".to_string()
        }
    });

    ErrorCategory::NonRetryable {
        code,
        message: truncate_message(error_str, 200),
        is_permission_error,
    }
}

/// Extract an AWS error code from either `Code: message` text or a debug `code: "Code"` field
fn extract_error_code(error_str: &str) -> Option<String> {
    if let Some(start) = error_str.find("code: Some(\"").map(|p| p + 12) {
        if let Some(end) = error_str[start..].find('"') {
            let code = &error_str[start..start + end];
            if !code.is_empty() && code.len() < 50 {
                return Some(code.to_string());
            }
        }
    }

    if let Some(start) = error_str.find("code:") {
        let after_code = &error_str[start + 5..];
        if let Some(quote_start) = after_code.find('"') {
            let after_quote = &after_code[quote_start + 1..];
            if let Some(quote_end) = after_quote.find('"') {
                let code = &after_quote[..quote_end];
                if !code.is_empty() && code.len() < 50 {
                    return Some(code.to_string());
                }
            }
        }
    }

    if let Some(pos) = error_str.find(':') {
        let prefix = error_str[..pos].trim();
        let code = prefix.rsplit("::").next().unwrap_or(prefix);
        if !code.is_empty()
            && code.len() < 50
            && !code.contains(' ')
            && code.chars().next().is_some_and(|c| c.is_uppercase())
        {
            return Some(code.to_string());
        }
    }

    None
}

fn truncate_message(msg: &str, max_len: usize) -> String {
    if msg.len() <= max_len {
        return msg.to_string();
    }
    let mut end = max_len - 3;
    while !msg.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &msg[..end])
}

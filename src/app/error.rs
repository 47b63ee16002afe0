//! Classified errors surfaced to the command line.
//!
//! SDK failures arrive as `anyhow::Error` and are classified through
//! [`ErrorCategory`](crate::app::cache_explorer::sdk_errors::ErrorCategory) before being
//! turned into an [`EcInfoError`]. Each kind carries a remediation hint for the user.

use thiserror::Error;

use crate::app::cache_explorer::sdk_errors::ErrorCategory;

#[derive(Debug, Error)]
pub enum EcInfoError {
    #[error("insufficient permissions: the AWS profile is not allowed to call {operation}")]
    Permission { operation: String, message: String },

    #[error("invalid parameter for {operation}: {message}")]
    InvalidParameter { operation: String, message: String },

    #[error("{operation} was throttled after {attempts} attempts")]
    Throttled { operation: String, attempts: u32 },

    #[error("cannot connect to AWS in {region}: {message}")]
    Connection { region: String, message: String },

    #[error("AWS credentials not found: {message}")]
    Credentials { message: String },

    #[error("AWS API error: {operation} failed ({code}): {message}")]
    Api {
        operation: String,
        code: String,
        message: String,
    },

    #[error("a region is required")]
    MissingRegion,

    #[error("invalid engine type: {0}. Valid engines: redis, valkey, memcached")]
    InvalidEngine(String),

    #[error("invalid field name: {invalid}. Valid fields: {valid}")]
    InvalidField { invalid: String, valid: String },

    #[error("invalid output format '{0}'. Valid formats: csv, markdown")]
    InvalidOutputFormat(String),

    #[error("invalid configuration in {path}: {message}")]
    Config { path: String, message: String },
}

impl EcInfoError {
    /// Suggested fix shown under the error message
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            EcInfoError::Permission { .. } => {
                Some("Make sure the IAM role has the elasticache:Describe* permissions")
            }
            EcInfoError::InvalidParameter { .. } => Some("Check that the parameter values are correct"),
            EcInfoError::Throttled { .. } | EcInfoError::Api { .. } => {
                Some("Check the AWS service health or retry later")
            }
            EcInfoError::Connection { .. } => {
                Some("Check the network connection and that the region name is correct")
            }
            EcInfoError::Credentials { .. } => Some(
                "Configure the AWS CLI or set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY",
            ),
            EcInfoError::MissingRegion => Some("Pass a region with --region"),
            EcInfoError::InvalidEngine(_)
            | EcInfoError::InvalidField { .. }
            | EcInfoError::InvalidOutputFormat(_)
            | EcInfoError::Config { .. } => None,
        }
    }

    /// Build a classified error from a categorized SDK failure
    pub fn from_category(
        category: ErrorCategory,
        operation: &str,
        region: &str,
        attempts: u32,
    ) -> Self {
        match category {
            ErrorCategory::Throttled { .. } => EcInfoError::Throttled {
                operation: operation.to_string(),
                attempts,
            },
            ErrorCategory::Timeout { .. } => EcInfoError::Connection {
                region: region.to_string(),
                message: format!("{} timed out", operation),
            },
            ErrorCategory::NetworkError { message } => EcInfoError::Connection {
                region: region.to_string(),
                message,
            },
            ErrorCategory::ServiceUnavailable { message, .. } => EcInfoError::Api {
                operation: operation.to_string(),
                code: "ServiceUnavailable".to_string(),
                message,
            },
            ErrorCategory::MissingCredentials { message } => EcInfoError::Credentials { message },
            ErrorCategory::NonRetryable {
                is_permission_error: true,
                message,
                ..
            } => EcInfoError::Permission {
                operation: operation.to_string(),
                message,
            },
            ErrorCategory::NonRetryable { code, message, .. }
                if code.starts_with("InvalidParameter") =>
            {
                EcInfoError::InvalidParameter {
                    operation: operation.to_string(),
                    message,
                }
            }
            ErrorCategory::NonRetryable { code, message, .. } => EcInfoError::Api {
                operation: operation.to_string(),
                code,
                message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_error_has_suggestion() {
        let err = EcInfoError::from_category(
            ErrorCategory::NonRetryable {
                code: "AccessDenied".to_string(),
                message: "not authorized".to_string(),
                is_permission_error: true,
            },
            "DescribeReplicationGroups",
            "us-east-1",
            1,
        );
        assert!(matches!(err, EcInfoError::Permission { .. }));
        assert!(err.to_string().contains("DescribeReplicationGroups"));
        assert!(err.suggestion().unwrap().contains("elasticache:Describe*"));
    }

    #[test]
    fn test_invalid_parameter_mapping() {
        let err = EcInfoError::from_category(
            ErrorCategory::NonRetryable {
                code: "InvalidParameterValue".to_string(),
                message: "bad marker".to_string(),
                is_permission_error: false,
            },
            "DescribeCacheClusters",
            "eu-west-1",
            1,
        );
        assert!(matches!(err, EcInfoError::InvalidParameter { .. }));
    }

    #[test]
    fn test_network_error_names_region() {
        let err = EcInfoError::from_category(
            ErrorCategory::NetworkError {
                message: "dns lookup failed".to_string(),
            },
            "DescribeCacheClusters",
            "ap-south-2",
            3,
        );
        assert!(matches!(err, EcInfoError::Connection { .. }));
        assert!(err.to_string().contains("ap-south-2"));
    }
}

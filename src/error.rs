use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub path: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn render(&self) -> String {
        if self.path.is_empty() {
            self.message.clone()
        } else {
            format!("{}: {}", self.path, self.message)
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{}", render_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            issues: vec![FieldIssue::new(path, message)],
        }
    }
}

fn render_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(FieldIssue::render)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Bluum API Error {code}: {message}")]
    Api { code: String, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to decode Bluum API response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
#[error("Invalid configuration: {}", render_issues(.issues))]
pub struct ConfigError {
    pub issues: Vec<FieldIssue>,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Unexpected failure in {tool}: {source:#}")]
    Unexpected {
        tool: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    impl ValidationError {
        pub(crate) fn mentions(&self, path: &str) -> bool {
            self.issues.iter().any(|issue| issue.path == path)
        }
    }

    #[test]
    fn validation_error_joins_issues_with_commas() {
        let err = ValidationError {
            issues: vec![
                FieldIssue::new("account_id", "Required"),
                FieldIssue::new("funding_details.method", "Required"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "account_id: Required, funding_details.method: Required"
        );
        assert!(err.mentions("funding_details.method"));
        assert!(!err.mentions("method"));
    }

    #[test]
    fn root_issue_renders_message_only() {
        let err = ValidationError::single("", "Expected object, received array");
        assert_eq!(err.to_string(), "Expected object, received array");
    }

    #[test]
    fn transport_errors_render_upstream_shape() {
        let api = TransportError::Api {
            code: "40410000".to_string(),
            message: "order not found".to_string(),
        };
        assert_eq!(api.to_string(), "Bluum API Error 40410000: order not found");

        let net = TransportError::Network("connection refused".to_string());
        assert_eq!(net.to_string(), "Network error: connection refused");
    }
}

use std::fmt;

#[derive(Debug)]
pub enum ReportError {
    /// Transport-level failure talking to the reporting server
    Http { context: String, source: reqwest::Error },

    /// Server answered with a non-success status
    Server { context: String, status: u16, body: String },

    /// Response body did not parse
    Json { context: String, source: serde_json::Error },

    /// An item call was attempted before the launch was started
    MissingLaunch,

    /// Backend declared unavailable (test failure switch, disabled mode)
    Unavailable(String),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::Http { context, source } => {
                write!(f, "HTTP request failed ({}): {}", context, source)
            }
            ReportError::Server { context, status, body } => {
                write!(f, "server rejected {} with status {}: {}", context, status, body)
            }
            ReportError::Json { context, source } => {
                write!(f, "response parse error ({}): {}", context, source)
            }
            ReportError::MissingLaunch => {
                write!(f, "no launch is active")
            }
            ReportError::Unavailable(msg) => {
                write!(f, "backend unavailable: {}", msg)
            }
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Http { source, .. } => Some(source),
            ReportError::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}

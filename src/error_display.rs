//! User-facing error message formatting.
//!
//! Uses typed error matching (ServerError, ureq::Error, io::ErrorKind) rather
//! than string parsing where the error type allows it.

use std::io;

use crate::client::ServerError;

/// Message and optional server traceback for display in the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub error: String,
    pub traceback: Option<String>,
}

impl FetchFailure {
    pub fn from_report(report: &color_eyre::eyre::Report) -> Self {
        for cause in report.chain() {
            if let Some(server) = cause.downcast_ref::<ServerError>() {
                return Self {
                    error: server.error.clone(),
                    traceback: server.traceback.clone(),
                };
            }
        }
        Self {
            error: user_message_from_report(report),
            traceback: None,
        }
    }
}

/// Format an io::Error as a user-facing message by matching on ErrorKind.
pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base: String = match err.kind() {
        ErrorKind::NotFound => "File or directory not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied.".to_string(),
        ErrorKind::ConnectionRefused => {
            "Connection refused. Is the D-Tale server running?".to_string()
        }
        ErrorKind::ConnectionReset => "Connection reset by the server.".to_string(),
        ErrorKind::TimedOut => "Request timed out.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            "Invalid or corrupted data.".to_string()
        }
        ErrorKind::UnexpectedEof => "Response ended unexpectedly.".to_string(),
        ErrorKind::Interrupted => "Operation interrupted.".to_string(),
        _ => err.to_string(),
    };

    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

/// Format an HTTP error from the D-Tale client.
pub fn user_message_from_http(err: &ureq::Error) -> String {
    match err {
        ureq::Error::Status(404, _) => {
            "Server returned 404: no dataset with that id (check --data-id).".to_string()
        }
        ureq::Error::Status(code, _) if *code >= 500 => {
            format!("Server error (HTTP {}). Check the D-Tale server log.", code)
        }
        ureq::Error::Status(code, _) => format!("Request rejected (HTTP {}).", code),
        ureq::Error::Transport(transport) => {
            use ureq::ErrorKind as UK;
            match transport.kind() {
                UK::Dns => "Could not resolve the server host name.".to_string(),
                UK::ConnectionFailed => {
                    "Could not connect to the D-Tale server. Is it running?".to_string()
                }
                UK::InvalidUrl | UK::UnknownScheme => {
                    format!("Invalid server URL: {}", transport)
                }
                UK::Io => {
                    let msg = transport.to_string();
                    if msg.contains("timed out") {
                        "Request timed out. Try a larger --timeout.".to_string()
                    } else {
                        format!("Network error: {}", msg)
                    }
                }
                _ => transport.to_string(),
            }
        }
    }
}

/// Format a color_eyre Report by downcasting to known error types.
/// Walks the cause chain and falls back to the first display line.
pub fn user_message_from_report(report: &color_eyre::eyre::Report) -> String {
    for cause in report.chain() {
        if let Some(server) = cause.downcast_ref::<ServerError>() {
            return server.error.clone();
        }
        if let Some(http) = cause.downcast_ref::<ureq::Error>() {
            return user_message_from_http(http);
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return user_message_from_io(io_err, None);
        }
        if let Some(json) = cause.downcast_ref::<serde_json::Error>() {
            return format!("Invalid response from server: {}", json);
        }
    }

    // First line only; server tracebacks are shown separately.
    let display = report.to_string();
    display
        .lines()
        .next()
        .map(str::trim)
        .unwrap_or("An error occurred")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::eyre;

    #[test]
    fn test_user_message_from_io_connection_refused() {
        let err = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let msg = user_message_from_io(&err, None);
        assert!(msg.contains("D-Tale server"), "got: {}", msg);
    }

    #[test]
    fn test_user_message_from_io_with_context() {
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let msg = user_message_from_io(&err, Some("(writing log)"));
        assert_eq!(msg, "Permission denied. (writing log)");
    }

    #[test]
    fn test_fetch_failure_keeps_server_traceback() {
        let report: color_eyre::eyre::Report = ServerError {
            error: "KeyError: 'a'".to_string(),
            traceback: Some("Traceback ...".to_string()),
        }
        .into();
        let failure = FetchFailure::from_report(&report);
        assert_eq!(failure.error, "KeyError: 'a'");
        assert_eq!(failure.traceback.as_deref(), Some("Traceback ..."));
    }

    #[test]
    fn test_fetch_failure_from_io_report() {
        let report: color_eyre::eyre::Report =
            io::Error::new(io::ErrorKind::TimedOut, "slow").into();
        let failure = FetchFailure::from_report(&report);
        assert_eq!(failure.error, "Request timed out.");
        assert!(failure.traceback.is_none());
    }

    #[test]
    fn test_report_fallback_uses_first_line() {
        let report = eyre!("first line\nsecond line");
        assert_eq!(user_message_from_report(&report), "first line");
    }
}

//! Shared HTTP agent configuration and bounded response helpers.

use std::io::{self, Read};
use std::time::Duration;

use crate::config::NetworkSettings;

/// Retry settings for idempotent network reads with exponential backoff.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RetryConfig {
    /// Maximum number of attempts, including the first try.
    pub max_attempts: usize,
    /// Base delay used for the exponential backoff.
    pub base_delay: Duration,
    /// Maximum delay allowed between attempts.
    pub max_delay: Duration,
}

impl RetryConfig {
    pub(crate) fn from_settings(settings: &NetworkSettings) -> Self {
        Self {
            max_attempts: settings.leaderboard_attempts.max(1),
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(2),
        }
    }
}

/// Build an HTTP agent with the configured timeouts.
///
/// A zero read timeout leaves reads unbounded so the backend's own request
/// timeout governs slow classifications.
pub(crate) fn build_agent(settings: &NetworkSettings) -> ureq::Agent {
    let mut builder = ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_secs(settings.connect_timeout_secs))
        .timeout_write(Duration::from_secs(settings.write_timeout_secs))
        .user_agent(concat!("shape-hunter/", env!("CARGO_PKG_VERSION")));
    if settings.read_timeout_secs > 0 {
        builder = builder.timeout_read(Duration::from_secs(settings.read_timeout_secs));
    }
    builder.build()
}

/// Retry an operation with bounded exponential backoff when the predicate allows it.
pub(crate) fn retry_with_backoff<T, E, F, R>(
    config: RetryConfig,
    mut action: F,
    mut should_retry: R,
) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    R: FnMut(&E) -> bool,
{
    let mut attempt = 0usize;
    loop {
        attempt += 1;
        match action() {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= config.max_attempts || !should_retry(&err) {
                    return Err(err);
                }
                std::thread::sleep(backoff_delay(
                    config.base_delay,
                    config.max_delay,
                    attempt,
                ));
            }
        }
    }
}

/// Read a response into memory, enforcing a maximum byte size.
pub(crate) fn read_response_bytes(
    response: ureq::Response,
    max_bytes: usize,
) -> Result<Vec<u8>, io::Error> {
    check_content_length(&response, max_bytes)?;
    let reader = response.into_reader();
    let mut limited = reader.take(max_bytes as u64 + 1);
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes)?;
    if bytes.len() > max_bytes {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Response exceeded {max_bytes} bytes"),
        ));
    }
    Ok(bytes)
}

/// Why a response body could not be turned into text.
#[derive(Debug, thiserror::Error)]
pub(crate) enum BodyReadError {
    /// The connection failed mid-body.
    #[error("Failed to read response body: {0}")]
    Transport(io::Error),
    /// The body was read but is too large or not UTF-8.
    #[error("{0}")]
    Invalid(String),
}

/// Read a response body as UTF-8 text with a byte cap.
pub(crate) fn read_body_limited(
    response: ureq::Response,
    max_bytes: usize,
) -> Result<String, BodyReadError> {
    let bytes = read_response_bytes(response, max_bytes).map_err(|err| match err.kind() {
        io::ErrorKind::InvalidData => BodyReadError::Invalid(err.to_string()),
        _ => BodyReadError::Transport(err),
    })?;
    String::from_utf8(bytes).map_err(|err| BodyReadError::Invalid(err.to_string()))
}

/// Render a failed request as a single-line cause string.
///
/// Status errors include a truncated body so backend `detail` messages survive.
pub(crate) fn describe_error(error: ureq::Error, max_bytes: usize) -> String {
    match error {
        ureq::Error::Status(code, response) => {
            let body = read_body_limited(response, max_bytes).unwrap_or_else(|err| err.to_string());
            let body = body.trim();
            if body.is_empty() {
                format!("HTTP {code}")
            } else {
                format!("HTTP {code}: {body}")
            }
        }
        ureq::Error::Transport(err) => err.to_string(),
    }
}

fn check_content_length(response: &ureq::Response, max_bytes: usize) -> Result<(), io::Error> {
    let Some(length) = response.header("Content-Length") else {
        return Ok(());
    };
    let Ok(length) = length.parse::<u64>() else {
        return Ok(());
    };
    if length > max_bytes as u64 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Response too large: {length} bytes"),
        ));
    }
    Ok(())
}

fn backoff_delay(base: Duration, max: Duration, attempt: usize) -> Duration {
    let exponent = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
    let delay = base.checked_mul(factor).unwrap_or(max);
    if delay > max { max } else { delay }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn test_agent() -> ureq::Agent {
        build_agent(&NetworkSettings::default())
    }

    #[test]
    fn read_response_bytes_rejects_content_length_over_max() {
        let (url, _rx) = test_server::serve_once(200, "text/plain", &"a".repeat(100));
        let response = test_agent().get(&url).call().unwrap();
        let err = read_response_bytes(response, 10).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn read_response_bytes_accepts_under_limit() {
        let (url, _rx) = test_server::serve_once(200, "text/plain", "hello");
        let response = test_agent().get(&url).call().unwrap();
        let bytes = read_response_bytes(response, 16).unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn cut_off_body_is_a_transport_failure() {
        let (url, _rx) = test_server::serve_truncated("application/json", r#"{"pred"#, 512);
        let response = test_agent().get(&url).call().unwrap();
        let err = read_body_limited(response, 1024).unwrap_err();
        assert!(matches!(err, BodyReadError::Transport(_)), "{err:?}");
    }

    #[test]
    fn oversized_body_is_invalid() {
        let (url, _rx) = test_server::serve_once(200, "text/plain", &"a".repeat(100));
        let response = test_agent().get(&url).call().unwrap();
        let err = read_body_limited(response, 10).unwrap_err();
        assert!(matches!(err, BodyReadError::Invalid(_)), "{err:?}");
    }

    #[test]
    fn describe_error_keeps_status_body() {
        let (url, _rx) = test_server::serve_once(503, "application/json", r#"{"detail":"busy"}"#);
        let err = test_agent().get(&url).call().unwrap_err();
        let message = describe_error(err, 1024);
        assert_eq!(message, r#"HTTP 503: {"detail":"busy"}"#);
    }

    #[test]
    fn retry_with_backoff_stops_after_success() {
        let mut attempts = 0usize;
        let config = RetryConfig {
            max_attempts: 4,
            base_delay: Duration::from_millis(0),
            max_delay: Duration::from_millis(0),
        };
        let result: Result<u32, &'static str> = retry_with_backoff(
            config,
            || {
                attempts += 1;
                if attempts < 3 { Err("fail") } else { Ok(7) }
            },
            |_| true,
        );
        assert_eq!(result, Ok(7));
        assert_eq!(attempts, 3);
    }

    #[test]
    fn retry_with_backoff_honors_should_retry() {
        let mut attempts = 0usize;
        let config = RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(0),
            max_delay: Duration::from_millis(0),
        };
        let result: Result<u32, &'static str> = retry_with_backoff(
            config,
            || {
                attempts += 1;
                Err("fail")
            },
            |_| false,
        );
        assert_eq!(result, Err("fail"));
        assert_eq!(attempts, 1);
    }

    #[test]
    fn backoff_delay_is_capped() {
        let base = Duration::from_millis(100);
        let max = Duration::from_millis(300);
        assert_eq!(backoff_delay(base, max, 1), Duration::from_millis(100));
        assert_eq!(backoff_delay(base, max, 2), Duration::from_millis(200));
        assert_eq!(backoff_delay(base, max, 3), max);
        assert_eq!(backoff_delay(base, max, 40), max);
    }
}

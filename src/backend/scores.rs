use super::{
    HttpBackend, LeaderboardEntry, LeaderboardError, ScoreError, ScoreSubmission, Scoreboard,
    valid_confidence,
};
use crate::http_client;

const MAX_LEADERBOARD_RESPONSE_BYTES: usize = 256 * 1024;
const MAX_SUBMIT_RESPONSE_BYTES: usize = 64 * 1024;
const MAX_ERROR_BODY_BYTES: usize = 4 * 1024;

impl HttpBackend {
    fn fetch_leaderboard_once(&self) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        let response = self
            .agent
            .get(self.endpoints.leaderboard.as_str())
            .set("Accept", "application/json")
            .call()
            .map_err(|err| LeaderboardError::Unavailable {
                cause: http_client::describe_error(err, MAX_ERROR_BODY_BYTES),
            })?;
        let body = http_client::read_body_limited(response, MAX_LEADERBOARD_RESPONSE_BYTES)?;
        parse_leaderboard(&body)
    }
}

impl Scoreboard for HttpBackend {
    fn submit_score(&self, submission: &ScoreSubmission) -> Result<(), ScoreError> {
        let response = self
            .agent
            .post(self.endpoints.score_submit.as_str())
            .set("Accept", "application/json")
            .send_json(submission)
            .map_err(|err| ScoreError::SubmissionFailed {
                cause: http_client::describe_error(err, MAX_ERROR_BODY_BYTES),
            })?;
        http_client::read_body_limited(response, MAX_SUBMIT_RESPONSE_BYTES)
            .map(|_| ())
            .map_err(|err| ScoreError::SubmissionFailed {
                cause: err.to_string(),
            })
    }

    /// Reads are idempotent, so transport and status failures are retried.
    fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        http_client::retry_with_backoff(
            self.leaderboard_retry,
            || self.fetch_leaderboard_once(),
            |err| matches!(err, LeaderboardError::Unavailable { .. }),
        )
    }
}

/// Parse a leaderboard array. An empty array is a valid, empty leaderboard.
pub fn parse_leaderboard(body: &str) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
    let entries: Vec<LeaderboardEntry> =
        serde_json::from_str(body.trim()).map_err(|err| LeaderboardError::MalformedResponse {
            detail: err.to_string(),
        })?;
    if let Some(bad) = entries
        .iter()
        .find(|entry| entry.rank == 0 || !valid_confidence(entry.score))
    {
        return Err(LeaderboardError::MalformedResponse {
            detail: format!("invalid entry for '{}' (rank {})", bad.user_id, bad.rank),
        });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::test_server::serve_once;
    use std::net::TcpListener;
    use std::time::Duration;

    #[test]
    fn parses_entries_with_optional_date() {
        let entries = parse_leaderboard(
            r#"[{"rank":1,"user_id":"kim","score":0.97,"date":"2025-11-22"},{"rank":2,"user_id":"lee","score":0.9}]"#,
        )
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].date.as_deref(), Some("2025-11-22"));
        assert_eq!(entries[1].date, None);
    }

    #[test]
    fn empty_leaderboard_is_valid() {
        assert!(parse_leaderboard("[]").unwrap().is_empty());
    }

    #[test]
    fn rejects_rank_zero_and_non_arrays() {
        assert!(parse_leaderboard(r#"[{"rank":0,"user_id":"kim","score":0.5}]"#).is_err());
        assert!(parse_leaderboard(r#"{"entries":[]}"#).is_err());
    }

    #[test]
    fn rejects_scores_outside_unit_range() {
        for score in ["1.2", "-0.01"] {
            let body = format!(r#"[{{"rank":1,"user_id":"kim","score":{score}}}]"#);
            assert!(
                matches!(
                    parse_leaderboard(&body),
                    Err(LeaderboardError::MalformedResponse { .. })
                ),
                "{score}"
            );
        }
        assert!(parse_leaderboard(r#"[{"rank":1,"user_id":"kim","score":1.0}]"#).is_ok());
    }

    #[test]
    fn submit_sends_match_id_only_when_present() {
        let (origin, rx) = serve_once(200, "application/json", r#"{"message":"saved"}"#);
        let backend = HttpBackend::for_origin(&origin);
        backend
            .submit_score(&ScoreSubmission {
                user_id: "kim".to_string(),
                shape: "cone".to_string(),
                confidence: 0.5,
                match_id: None,
            })
            .unwrap();
        let request = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(request.request_line, "POST /compete/submit HTTP/1.1");
        let sent: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(
            sent,
            serde_json::json!({"user_id": "kim", "shape": "cone", "confidence": 0.5})
        );
    }

    #[test]
    fn submit_failure_carries_cause() {
        let (origin, _rx) = serve_once(422, "application/json", r#"{"detail":"bad"}"#);
        let err = HttpBackend::for_origin(&origin)
            .submit_score(&ScoreSubmission {
                user_id: "kim".to_string(),
                shape: "cone".to_string(),
                confidence: 0.5,
                match_id: Some("m-1".to_string()),
            })
            .unwrap_err();
        assert!(err.to_string().contains("422"));
    }

    #[test]
    fn fetches_leaderboard() {
        let (origin, rx) = serve_once(
            200,
            "application/json",
            r#"[{"rank":1,"user_id":"kim","score":0.97}]"#,
        );
        let entries = HttpBackend::for_origin(&origin).leaderboard().unwrap();
        assert_eq!(entries[0].user_id, "kim");
        let request = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(request.request_line, "GET /ranking/top10 HTTP/1.1");
    }

    #[test]
    fn unreachable_backend_is_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = HttpBackend::for_origin(&format!("http://{addr}"))
            .leaderboard()
            .unwrap_err();
        assert!(matches!(err, LeaderboardError::Unavailable { .. }));
    }
}

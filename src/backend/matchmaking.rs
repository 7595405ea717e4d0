use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{
    HttpBackend, JoinOutcome, MatchReport, Matchmaker, MatchmakingError, valid_confidence,
};
use crate::http_client;

const MAX_MATCH_RESPONSE_BYTES: usize = 64 * 1024;
const MAX_ERROR_BODY_BYTES: usize = 4 * 1024;

#[derive(Serialize)]
struct JoinRequest<'a> {
    user_id: &'a str,
}

#[derive(Deserialize)]
struct JoinResponseWire {
    status: String,
    match_id: Option<String>,
    opponent_id: Option<String>,
}

#[derive(Deserialize)]
struct MatchStatusWire {
    #[serde(default)]
    players: Vec<String>,
    #[serde(default)]
    scores: HashMap<String, f64>,
}

impl HttpBackend {
    fn read_match_body(&self, response: ureq::Response) -> Result<String, MatchmakingError> {
        Ok(http_client::read_body_limited(response, MAX_MATCH_RESPONSE_BYTES)?)
    }
}

fn unavailable(err: ureq::Error) -> MatchmakingError {
    MatchmakingError::Unavailable {
        cause: http_client::describe_error(err, MAX_ERROR_BODY_BYTES),
    }
}

impl Matchmaker for HttpBackend {
    fn join(&self, user_id: &str) -> Result<JoinOutcome, MatchmakingError> {
        let response = self
            .agent
            .post(self.endpoints.match_join.as_str())
            .set("Accept", "application/json")
            .send_json(JoinRequest { user_id })
            .map_err(unavailable)?;
        let body = self.read_match_body(response)?;
        parse_join_response(&body)
    }

    fn opponent_confidence(
        &self,
        match_id: &str,
        opponent_id: &str,
    ) -> Result<Option<f64>, MatchmakingError> {
        let mut url = self.endpoints.match_status.clone();
        url.path_segments_mut()
            .map_err(|_| MatchmakingError::Unavailable {
                cause: format!("cannot build status URL from {}", self.endpoints.match_status),
            })?
            .pop_if_empty()
            .push(match_id);
        let response = self
            .agent
            .get(url.as_str())
            .set("Accept", "application/json")
            .call()
            .map_err(unavailable)?;
        let body = self.read_match_body(response)?;
        parse_match_status(&body, opponent_id)
    }

    fn report_result(&self, report: &MatchReport) -> Result<(), MatchmakingError> {
        let response = self
            .agent
            .post(self.endpoints.match_result.as_str())
            .set("Accept", "application/json")
            .send_json(report)
            .map_err(unavailable)?;
        self.read_match_body(response).map(|_| ())
    }
}

/// Parse a join response. Fields other than `status`, `match_id` and
/// `opponent_id` are ignored.
pub fn parse_join_response(body: &str) -> Result<JoinOutcome, MatchmakingError> {
    let parsed: JoinResponseWire =
        serde_json::from_str(body.trim()).map_err(|err| MatchmakingError::MalformedResponse {
            detail: err.to_string(),
        })?;
    match parsed.status.trim() {
        "waiting" => Ok(JoinOutcome::Waiting),
        "matched" => match (parsed.match_id, parsed.opponent_id) {
            (Some(match_id), Some(opponent_id))
                if !match_id.is_empty() && !opponent_id.is_empty() =>
            {
                Ok(JoinOutcome::Matched {
                    match_id,
                    opponent_id,
                })
            }
            _ => Err(MatchmakingError::MalformedResponse {
                detail: "matched response without match_id/opponent_id".to_string(),
            }),
        },
        other => Err(MatchmakingError::MalformedResponse {
            detail: format!("unknown status '{other}'"),
        }),
    }
}

/// Extract the opponent's confidence from a match status body, if reported.
pub fn parse_match_status(body: &str, opponent_id: &str) -> Result<Option<f64>, MatchmakingError> {
    let parsed: MatchStatusWire =
        serde_json::from_str(body.trim()).map_err(|err| MatchmakingError::MalformedResponse {
            detail: err.to_string(),
        })?;
    if !parsed.players.is_empty() && !parsed.players.iter().any(|p| p == opponent_id) {
        return Err(MatchmakingError::MalformedResponse {
            detail: format!("opponent '{opponent_id}' is not a player in this match"),
        });
    }
    match parsed.scores.get(opponent_id).copied() {
        Some(value) if !valid_confidence(value) => Err(MatchmakingError::MalformedResponse {
            detail: format!("opponent confidence {value} is outside [0, 1]"),
        }),
        other => Ok(other),
    }
}

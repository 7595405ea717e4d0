use serde::Deserialize;

use super::multipart::MultipartBody;
use super::{ClassificationError, Classifier, HttpBackend, valid_confidence};
use crate::http_client;
use crate::intake::ImagePayload;
use crate::scoring::Prediction;

const MAX_CLASSIFY_RESPONSE_BYTES: usize = 1024 * 1024;
const MAX_ERROR_BODY_BYTES: usize = 4 * 1024;
const FILE_FIELD: &str = "file";

#[derive(Deserialize)]
struct ClassifyResponseWire {
    predictions: Vec<Prediction>,
}

impl Classifier for HttpBackend {
    fn classify(&self, image: &ImagePayload) -> Result<Vec<Prediction>, ClassificationError> {
        let body = MultipartBody::single_file(
            FILE_FIELD,
            &image.file_name,
            &image.media_type,
            &image.bytes,
        );
        tracing::info!(
            "Classifying {} ({} bytes)",
            image.file_name,
            image.bytes.len()
        );
        let response = self
            .agent
            .post(self.endpoints.classify.as_str())
            .set("Accept", "application/json")
            .set("Content-Type", &body.content_type)
            .send_bytes(&body.bytes)
            .map_err(|err| ClassificationError::Unavailable {
                cause: http_client::describe_error(err, MAX_ERROR_BODY_BYTES),
            })?;
        let text = http_client::read_body_limited(response, MAX_CLASSIFY_RESPONSE_BYTES)?;
        parse_predictions(&text)
    }
}

/// Parse a `{ "predictions": [{label, confidence}] }` body.
pub fn parse_predictions(body: &str) -> Result<Vec<Prediction>, ClassificationError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(ClassificationError::MalformedResponse {
            detail: "Empty response body".to_string(),
        });
    }
    let parsed: ClassifyResponseWire =
        serde_json::from_str(trimmed).map_err(|err| ClassificationError::MalformedResponse {
            detail: err.to_string(),
        })?;
    if let Some(bad) = parsed
        .predictions
        .iter()
        .find(|prediction| !valid_confidence(prediction.confidence))
    {
        return Err(ClassificationError::MalformedResponse {
            detail: format!(
                "confidence {} for '{}' is outside [0, 1]",
                bad.confidence, bad.label
            ),
        });
    }
    Ok(parsed.predictions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::test_server::{serve_once, serve_truncated};
    use std::sync::Arc;
    use std::time::Duration;

    fn payload() -> ImagePayload {
        ImagePayload {
            file_name: "ball.png".to_string(),
            media_type: "image/png".to_string(),
            bytes: Arc::from(&b"\x89PNGdata"[..]),
        }
    }

    #[test]
    fn parses_prediction_list() {
        let predictions = parse_predictions(
            r#"{"predictions":[{"label":"sphere","confidence":0.8},{"label":"cube","confidence":0.2}],"model":"v2"}"#,
        )
        .unwrap();
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0], Prediction::new("sphere", 0.8));
    }

    #[test]
    fn empty_prediction_list_is_valid() {
        assert!(parse_predictions(r#"{"predictions":[]}"#).unwrap().is_empty());
    }

    #[test]
    fn rejects_bodies_that_do_not_fit_the_shape() {
        for body in [
            "",
            "[]",
            r#"{"label":"sphere"}"#,
            r#"{"predictions":[{"label":"sphere"}]}"#,
            r#"{"predictions":[{"label":"sphere","confidence":1.5}]}"#,
            r#"{"predictions":[{"label":"sphere","confidence":-0.1}]}"#,
        ] {
            assert!(
                matches!(
                    parse_predictions(body),
                    Err(ClassificationError::MalformedResponse { .. })
                ),
                "{body}"
            );
        }
    }

    #[test]
    fn uploads_multipart_file_field() {
        let (origin, rx) = serve_once(
            200,
            "application/json",
            r#"{"predictions":[{"label":"sphere","confidence":0.9}]}"#,
        );
        let backend = HttpBackend::for_origin(&origin);
        let predictions = backend.classify(&payload()).unwrap();
        assert_eq!(predictions, vec![Prediction::new("sphere", 0.9)]);

        let request = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(request.request_line, "POST /visualize/visualize HTTP/1.1");
        assert!(
            request
                .header("content-type")
                .unwrap()
                .starts_with("multipart/form-data; boundary=")
        );
        let body = request.body_text();
        assert!(body.contains("name=\"file\"; filename=\"ball.png\""));
        assert!(body.contains("PNGdata"));
    }

    #[test]
    fn non_success_status_is_unavailable_with_body() {
        let (origin, _rx) = serve_once(500, "application/json", r#"{"detail":"model offline"}"#);
        let err = HttpBackend::for_origin(&origin)
            .classify(&payload())
            .unwrap_err();
        match err {
            ClassificationError::Unavailable { cause } => {
                assert!(cause.contains("500"));
                assert!(cause.contains("model offline"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn connection_dropped_mid_body_is_unavailable() {
        let (origin, _rx) = serve_truncated("application/json", r#"{"predictions":["#, 4096);
        let err = HttpBackend::for_origin(&origin)
            .classify(&payload())
            .unwrap_err();
        assert!(matches!(err, ClassificationError::Unavailable { .. }), "{err:?}");
    }

    #[test]
    fn garbage_success_body_is_malformed() {
        let (origin, _rx) = serve_once(200, "text/html", "<html>oops</html>");
        let err = HttpBackend::for_origin(&origin)
            .classify(&payload())
            .unwrap_err();
        assert!(matches!(err, ClassificationError::MalformedResponse { .. }));
    }
}

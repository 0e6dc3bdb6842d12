use crate::error::HttpError;
use stateflow_core::{ErrorClassifier, ErrorKind, MessageRules};
use std::collections::BTreeSet;

/// Classifies [`HttpError`]s by status code, then by response body
///
/// Defaults: 404 and 410 are not-found; 408, 425, 429, 500, 502, 503 and 504
/// are transient, as are connect failures and request timeouts. Everything
/// else is fatal unless a body rule says otherwise.
#[derive(Debug, Clone)]
pub struct HttpErrorClassifier {
    not_found: BTreeSet<u16>,
    transient: BTreeSet<u16>,
    body_rules: MessageRules,
}

impl Default for HttpErrorClassifier {
    fn default() -> Self {
        Self {
            not_found: [404, 410].into_iter().collect(),
            transient: [408, 425, 429, 500, 502, 503, 504].into_iter().collect(),
            body_rules: MessageRules::new(),
        }
    }
}

impl HttpErrorClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn not_found_status(mut self, status: u16) -> Self {
        self.transient.remove(&status);
        self.not_found.insert(status);
        self
    }

    pub fn transient_status(mut self, status: u16) -> Self {
        self.not_found.remove(&status);
        self.transient.insert(status);
        self
    }

    /// Rules applied to the body of responses whose status matched neither set
    ///
    /// Some APIs answer 400 with `{"code": "ResourceNotFound"}`.
    pub fn with_body_rules(mut self, rules: MessageRules) -> Self {
        self.body_rules = rules;
        self
    }
}

impl ErrorClassifier<HttpError> for HttpErrorClassifier {
    fn classify(&self, error: &HttpError) -> ErrorKind {
        match error {
            HttpError::Status { status, body } => {
                if self.not_found.contains(status) {
                    ErrorKind::NotFound
                } else if self.transient.contains(status) {
                    ErrorKind::Transient
                } else {
                    self.body_rules.classify_message(body)
                }
            }
            HttpError::Request(e) => match e.status() {
                Some(status) => {
                    let status = status.as_u16();
                    if self.not_found.contains(&status) {
                        ErrorKind::NotFound
                    } else if self.transient.contains(&status) {
                        ErrorKind::Transient
                    } else {
                        ErrorKind::Fatal
                    }
                }
                None if e.is_timeout() || e.is_connect() || e.is_request() => {
                    ErrorKind::Transient
                }
                None => ErrorKind::Fatal,
            },
            HttpError::Json(_)
            | HttpError::MissingStatus { .. }
            | HttpError::MissingEnvelope { .. }
            | HttpError::InvalidTemplate { .. } => ErrorKind::Fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16, body: &str) -> HttpError {
        HttpError::Status {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_default_status_codes() {
        let classifier = HttpErrorClassifier::new();

        assert_eq!(classifier.classify(&status(404, "")), ErrorKind::NotFound);
        assert_eq!(classifier.classify(&status(410, "")), ErrorKind::NotFound);
        for code in [408, 425, 429, 500, 502, 503, 504] {
            assert_eq!(classifier.classify(&status(code, "")), ErrorKind::Transient);
        }
        for code in [400, 401, 403, 409, 422] {
            assert_eq!(classifier.classify(&status(code, "")), ErrorKind::Fatal);
        }
    }

    #[test]
    fn test_custom_status_codes() {
        let classifier = HttpErrorClassifier::new()
            .transient_status(409)
            .not_found_status(503);

        assert_eq!(classifier.classify(&status(409, "")), ErrorKind::Transient);
        assert_eq!(classifier.classify(&status(503, "")), ErrorKind::NotFound);
    }

    #[test]
    fn test_body_rules() {
        let classifier = HttpErrorClassifier::new().with_body_rules(
            MessageRules::new()
                .not_found_when("ResourceNotFound")
                .transient_when("still_in_use"),
        );

        assert_eq!(
            classifier.classify(&status(400, r#"{"code":"ResourceNotFound"}"#)),
            ErrorKind::NotFound
        );
        assert_eq!(
            classifier.classify(&status(400, r#"{"error_code":"still_in_use"}"#)),
            ErrorKind::Transient
        );
        assert_eq!(
            classifier.classify(&status(400, r#"{"code":"BadRequest"}"#)),
            ErrorKind::Fatal
        );
    }

    #[test]
    fn test_local_errors_are_fatal() {
        let classifier = HttpErrorClassifier::new();
        let missing = HttpError::MissingStatus {
            pointer: "/status".to_string(),
        };
        let envelope = HttpError::MissingEnvelope {
            pointer: "/server".to_string(),
        };
        let json = HttpError::Json(serde_json::from_str::<serde_json::Value>("{").unwrap_err());

        assert_eq!(classifier.classify(&missing), ErrorKind::Fatal);
        assert_eq!(classifier.classify(&envelope), ErrorKind::Fatal);
        assert_eq!(classifier.classify(&json), ErrorKind::Fatal);
    }
}

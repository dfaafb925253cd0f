//! Typed outcome of a single remote mutation.
//!
//! Every create / update / delete / check call yields an [`Outcome`] instead
//! of an error: a failed call is terminal for that entity only, and the
//! reconciler keeps going with the next one.

use std::fmt;

// ---------------------------------------------------------------------------
// Status classification
// ---------------------------------------------------------------------------

/// Raw status classification of a remote response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusClass {
    Ok,
    NotFound,
    InvalidInput,
    Unrecognized,
}

impl StatusClass {
    pub fn from_http(code: u16) -> Self {
        match code {
            200 | 204 => StatusClass::Ok,
            404 => StatusClass::NotFound,
            422 => StatusClass::InvalidInput,
            _ => StatusClass::Unrecognized,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusClass::Ok => "ok",
            StatusClass::NotFound => "not-found",
            StatusClass::InvalidInput => "invalid-input",
            StatusClass::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator-facing message for an HTTP status code.
pub fn status_message(code: u16) -> &'static str {
    match code {
        200 => "Operation successful",
        204 => "The resource was deleted successfully",
        404 => "Resource not found",
        422 => "Invalid input",
        _ => "Unrecognized response code",
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct Outcome<T> {
    pub ok: bool,
    /// Present on success (for deletes: `Some(())`).
    pub payload: Option<T>,
    pub message: String,
    pub status: StatusClass,
    /// `None` when no response was received at all.
    pub http_status: Option<u16>,
}

impl<T> Outcome<T> {
    pub fn success(payload: T) -> Self {
        Self {
            ok: true,
            payload: Some(payload),
            message: status_message(200).to_string(),
            status: StatusClass::Ok,
            http_status: Some(200),
        }
    }

    pub fn failure(status: StatusClass, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            payload: None,
            message: message.into(),
            status,
            http_status: None,
        }
    }

    /// Classify an HTTP response. `detail` (the remote error text, if any) is
    /// appended to the canned status message.
    pub fn from_http(code: u16, payload: Option<T>, detail: Option<&str>) -> Self {
        let status = StatusClass::from_http(code);
        let mut message = status_message(code).to_string();
        if let Some(d) = detail.filter(|d| !d.trim().is_empty()) {
            message.push_str(": ");
            message.push_str(d.trim());
        }
        let ok = status == StatusClass::Ok;
        Self {
            ok,
            payload: if ok { payload } else { None },
            message,
            status,
            http_status: Some(code),
        }
    }

    pub fn is_success(&self) -> bool {
        self.ok && self.payload.is_some()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            ok: self.ok,
            payload: self.payload.map(f),
            message: self.message,
            status: self.status,
            http_status: self.http_status,
        }
    }

    /// Collapse into a `Result`. An `ok` outcome without a payload is a failure.
    pub fn into_result(self) -> Result<T, RemoteFailure> {
        match (self.ok, self.payload) {
            (true, Some(p)) => Ok(p),
            (true, None) => Err(RemoteFailure {
                status: StatusClass::Unrecognized,
                http_status: self.http_status,
                message: format!("{} (empty response payload)", self.message),
            }),
            (false, _) => Err(RemoteFailure {
                status: self.status,
                http_status: self.http_status,
                message: self.message,
            }),
        }
    }
}

/// Failure half of an [`Outcome`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteFailure {
    pub status: StatusClass,
    pub http_status: Option<u16>,
    pub message: String,
}

impl fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.http_status {
            Some(code) => write!(f, "[{} {}] {}", self.status, code, self.message),
            None => write!(f, "[{}] {}", self.status, self.message),
        }
    }
}

impl std::error::Error for RemoteFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognized_codes() {
        let o: Outcome<u8> = Outcome::from_http(200, Some(1), None);
        assert!(o.is_success());
        assert_eq!(o.message, "Operation successful");

        let o: Outcome<u8> = Outcome::from_http(422, Some(1), Some("name is required"));
        assert!(!o.ok);
        assert!(o.payload.is_none(), "payload dropped on failure");
        assert_eq!(o.status, StatusClass::InvalidInput);
        assert_eq!(o.message, "Invalid input: name is required");
    }

    #[test]
    fn unrecognized_code() {
        let o: Outcome<()> = Outcome::from_http(500, None, None);
        assert!(!o.ok);
        assert_eq!(o.status, StatusClass::Unrecognized);
        assert_eq!(o.message, "Unrecognized response code");
    }

    #[test]
    fn ok_without_payload_is_not_success() {
        let o: Outcome<u8> = Outcome::from_http(200, None, None);
        assert!(!o.is_success());
        let err = o.into_result().unwrap_err();
        assert!(err.message.contains("empty response payload"));
    }

    #[test]
    fn failure_display_includes_status() {
        let err = Outcome::<()>::from_http(404, None, None)
            .into_result()
            .unwrap_err();
        assert_eq!(err.to_string(), "[not-found 404] Resource not found");
    }
}

//! Conversions from external infrastructure errors into the shared error
//! vocabulary.

use std::error::Error as StdError;
use std::io;

use reqwest::Error as HttpError;
use wavelink_common::CommonError;
use wavelink_domain::RequestFailure;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into [`CommonError`].
#[derive(Debug)]
pub struct InfraError(pub CommonError);

impl From<InfraError> for CommonError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<CommonError> for InfraError {
    fn from(value: CommonError) -> Self {
        InfraError(value)
    }
}

trait IntoCommonError {
    fn into_common(self) -> CommonError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → CommonError */
/* -------------------------------------------------------------------------- */

impl IntoCommonError for HttpError {
    fn into_common(self) -> CommonError {
        if self.is_timeout() {
            return CommonError::backend("http", "HTTP request timed out", true);
        }

        if self.is_connect() {
            return CommonError::backend("http", "HTTP connection failure", true);
        }

        if self.is_decode() {
            return CommonError::serialization_format("JSON", self.to_string());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));
            let retryable = code == 429 || status.is_server_error();
            return CommonError::backend("http", message, retryable);
        }

        CommonError::backend("http", self.to_string(), false)
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_common())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → RequestFailure */
/* -------------------------------------------------------------------------- */

/// Classify a transport-level reqwest failure for the retry engine.
pub fn request_failure(err: &HttpError) -> RequestFailure {
    if err.is_timeout() {
        return RequestFailure::Timeout;
    }

    if let Some(status) = err.status() {
        return RequestFailure::status(status.as_u16());
    }

    if was_reset(err) {
        return RequestFailure::ConnectionReset;
    }

    if err.is_connect() {
        return RequestFailure::Network(format!("connection failure: {err}"));
    }

    RequestFailure::Network(err.to_string())
}

fn was_reset(err: &HttpError) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted
            ) {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

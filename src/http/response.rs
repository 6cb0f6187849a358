//! Response representation and decoding.
//!
//! # Responsibilities
//! - Hold the status, headers and body returned by the transport
//! - Map a response to a method's declared return type
//!
//! # Design Decisions
//! - Non-2xx answers become `ApiError::Status` before decoding, except when
//!   the caller asks for the raw `ApiResponse`
//! - Bodies are fully buffered (`Bytes`), so responses are cheap to clone
//!   for caching

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// A buffered HTTP response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Body as UTF-8 text, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Fail with `ApiError::Status` unless the status is 2xx.
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::Status {
                status: self.status,
                body: self.text(),
            })
        }
    }
}

/// Conversion from a response to a declared return type.
pub trait FromResponse: Sized + Send + 'static {
    fn from_response(response: ApiResponse) -> Result<Self, ApiError>;
}

impl FromResponse for ApiResponse {
    fn from_response(response: ApiResponse) -> Result<Self, ApiError> {
        Ok(response)
    }
}

impl FromResponse for () {
    fn from_response(response: ApiResponse) -> Result<Self, ApiError> {
        response.error_for_status().map(|_| ())
    }
}

impl FromResponse for Bytes {
    fn from_response(response: ApiResponse) -> Result<Self, ApiError> {
        Ok(response.error_for_status()?.body)
    }
}

impl FromResponse for String {
    fn from_response(response: ApiResponse) -> Result<Self, ApiError> {
        let body = response.error_for_status()?.body;
        String::from_utf8(body.to_vec()).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

impl FromResponse for Value {
    fn from_response(response: ApiResponse) -> Result<Self, ApiError> {
        let body = response.error_for_status()?.body;
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// A JSON body decoded into `T`.
#[derive(Debug, Clone, PartialEq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: DeserializeOwned + Send + 'static> FromResponse for Json<T> {
    fn from_response(response: ApiResponse) -> Result<Self, ApiError> {
        let body = response.error_for_status()?.body;
        serde_json::from_slice(&body)
            .map(Json)
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

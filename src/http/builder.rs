//! Default request-building layer.
//!
//! Turns `(method descriptor, arguments)` into a [`WireRequest`]:
//!
//! ```text
//! target:  absolute path template
//!          | configured base address ⨝ path template
//!          | contract base address ⨝ path template
//! path:    {name} ← percent-encoded `path` argument
//! query:   `query` arguments (arrays repeat the key, null is omitted)
//! headers: interceptor headers, then `header` arguments
//! body:    `body` argument as JSON
//! ```

use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;
use url::Url;

use crate::contract::ParamRole;
use crate::error::ApiError;
use crate::http::request::ApiRequest;

/// Everything outside the RFC 3986 unreserved characters.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// A fully resolved HTTP request, ready for the transport.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl WireRequest {
    /// Admission key: `scheme://host:port`.
    pub fn destination(&self) -> String {
        self.url.origin().ascii_serialization()
    }
}

/// Builds wire requests against an optional configured base address.
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    base_address: Option<Url>,
}

impl RequestBuilder {
    pub fn new(base_address: Option<Url>) -> Self {
        Self { base_address }
    }

    pub fn base_address(&self) -> Option<&Url> {
        self.base_address.as_ref()
    }

    /// Resolve `request` into a wire request.
    ///
    /// `contract_base` is the contract-level fallback destination.
    pub fn build(&self, request: &ApiRequest, contract_base: Option<&str>) -> Result<WireRequest, ApiError> {
        let method = request.method();
        let args = request.arguments();

        let mut path = method.path.to_string();
        for param in method.params_with(ParamRole::Path) {
            let value = match args.get(param.name) {
                None | Some(Value::Null) => return Err(ApiError::missing(param.name)),
                Some(value) => scalar(value),
            };
            path = path.replace(&format!("{{{}}}", param.name), &utf8_percent_encode(&value, PATH_SEGMENT).to_string());
        }

        let mut url = self.resolve(&path, contract_base)?;

        {
            let mut query: Vec<(&str, String)> = Vec::new();
            for param in method.params_with(ParamRole::Query) {
                match args.get(param.name) {
                    None | Some(Value::Null) => {}
                    Some(Value::Array(items)) => {
                        query.extend(items.iter().filter(|v| !v.is_null()).map(|v| (param.name, scalar(v))));
                    }
                    Some(value) => query.push((param.name, scalar(value))),
                }
            }
            if !query.is_empty() {
                let mut pairs = url.query_pairs_mut();
                for (name, value) in query {
                    pairs.append_pair(name, &value);
                }
            }
        }

        let mut headers = request.headers().clone();
        for param in method.params_with(ParamRole::Header) {
            let value = match args.get(param.name) {
                None | Some(Value::Null) => continue,
                Some(value) => scalar(value),
            };
            let name = HeaderName::from_bytes(param.name.replace('_', "-").as_bytes())
                .map_err(|e| ApiError::Encode(format!("header `{}`: {}", param.name, e)))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|e| ApiError::Encode(format!("header `{}`: {}", param.name, e)))?;
            headers.insert(name, value);
        }

        let mut body = None;
        if let Some(param) = method.params_with(ParamRole::Body).next() {
            if let Some(value) = args.get(param.name).filter(|v| !v.is_null()) {
                let bytes = serde_json::to_vec(value).map_err(|e| ApiError::Encode(e.to_string()))?;
                headers
                    .entry(CONTENT_TYPE)
                    .or_insert(HeaderValue::from_static("application/json"));
                body = Some(Bytes::from(bytes));
            }
        }

        Ok(WireRequest {
            method: method.verb.clone(),
            url,
            headers,
            body,
        })
    }

    fn resolve(&self, path: &str, contract_base: Option<&str>) -> Result<Url, ApiError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path).map_err(|e| ApiError::Encode(format!("target `{}`: {}", path, e)));
        }

        let base = match (&self.base_address, contract_base) {
            (Some(base), _) => base.clone(),
            (None, Some(base)) => {
                Url::parse(base).map_err(|e| ApiError::Encode(format!("base address `{}`: {}", base, e)))?
            }
            (None, None) => return Err(ApiError::missing("base_address")),
        };

        base.join(path)
            .map_err(|e| ApiError::Encode(format!("path `{}`: {}", path, e)))
    }
}

/// Render a JSON value as a plain string.
fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

//! Contract validation.
//!
//! # Responsibilities
//! - Reject contracts that are not pure capability contracts
//!   (`InvalidContract`)
//! - Reject shapes the request builder cannot express (`UnsupportedType`)
//!
//! Runs once per contract type, before its descriptor is cached.

use reqwest::Method;
use std::collections::HashSet;

use crate::config::validation::check_base_address;
use crate::contract::descriptor::{MethodDescriptor, ParamRole};
use crate::error::ApiError;

const STANDARD_VERBS: [Method; 9] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
    Method::CONNECT,
    Method::PATCH,
    Method::TRACE,
];

/// Validate a contract's declared methods.
pub fn validate_contract(
    contract: &str,
    base_address: Option<&str>,
    methods: &[MethodDescriptor],
) -> Result<(), ApiError> {
    if methods.is_empty() {
        return Err(ApiError::invalid_contract(contract, "declares no methods"));
    }

    if let Some(base) = base_address {
        check_base_address(base)
            .map_err(|e| ApiError::invalid_contract(contract, format!("base address {}", e)))?;
    }

    let mut names = HashSet::new();
    for method in methods {
        if method.name.is_empty() {
            return Err(ApiError::invalid_contract(contract, "method with an empty name"));
        }
        if !names.insert(method.name) {
            return Err(ApiError::invalid_contract(
                contract,
                format!("method `{}` declared twice", method.name),
            ));
        }
        validate_method(contract, method)?;
    }

    Ok(())
}

fn validate_method(contract: &str, method: &MethodDescriptor) -> Result<(), ApiError> {
    let invalid = |reason: String| ApiError::invalid_contract(contract, reason);

    let mut params = HashSet::new();
    for param in &method.params {
        if param.name.is_empty() {
            return Err(invalid(format!("`{}` has a parameter with an empty name", method.name)));
        }
        if !params.insert(param.name) {
            return Err(invalid(format!(
                "`{}` declares parameter `{}` twice",
                method.name, param.name
            )));
        }
    }

    let placeholders = method.placeholders();
    for placeholder in &placeholders {
        let bound = method
            .params_with(ParamRole::Path)
            .any(|p| p.name == *placeholder);
        if !bound {
            return Err(invalid(format!(
                "`{}` has placeholder `{{{}}}` without a path parameter",
                method.name, placeholder
            )));
        }
    }
    for param in method.params_with(ParamRole::Path) {
        if !placeholders.contains(&param.name) {
            return Err(invalid(format!(
                "`{}` path parameter `{}` has no placeholder",
                method.name, param.name
            )));
        }
    }

    let bodies = method.params_with(ParamRole::Body).count();
    if bodies > 1 {
        return Err(invalid(format!("`{}` declares {} body parameters", method.name, bodies)));
    }

    if !STANDARD_VERBS.contains(&method.verb) {
        return Err(ApiError::unsupported(
            contract,
            format!("`{}` uses non-standard verb {}", method.name, method.verb),
        ));
    }
    let bodyless = [Method::GET, Method::HEAD, Method::OPTIONS, Method::TRACE];
    if bodies > 0 && bodyless.contains(&method.verb) {
        return Err(ApiError::unsupported(
            contract,
            format!("`{}` sends a body with {}", method.name, method.verb),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::descriptor::ReturnShape;

    fn get(name: &'static str, path: &'static str) -> MethodDescriptor {
        MethodDescriptor::new(name, Method::GET, path, ReturnShape::Pending)
    }

    fn reason(err: ApiError) -> String {
        match err {
            ApiError::InvalidContract { reason, .. } | ApiError::UnsupportedType { reason, .. } => reason,
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn accepts_well_formed_contract() {
        let methods = vec![
            get("home", "/"),
            get("user", "/users/{id}").param("id", ParamRole::Path).param("verbose", ParamRole::Query),
            MethodDescriptor::new("create", Method::POST, "/users", ReturnShape::Blocking)
                .param("user", ParamRole::Body),
        ];
        assert!(validate_contract("Api", Some("https://example.com"), &methods).is_ok());
    }

    #[test]
    fn rejects_empty_contract() {
        let err = validate_contract("Empty", None, &[]).unwrap_err();
        assert!(matches!(err, ApiError::InvalidContract { .. }));
    }

    #[test]
    fn rejects_duplicate_method() {
        let err = validate_contract("Api", None, &[get("home", "/"), get("home", "/x")]).unwrap_err();
        assert!(reason(err).contains("declared twice"));
    }

    #[test]
    fn rejects_unbound_placeholder() {
        let err = validate_contract("Api", None, &[get("user", "/users/{id}")]).unwrap_err();
        assert!(reason(err).contains("without a path parameter"));
    }

    #[test]
    fn rejects_path_param_without_placeholder() {
        let m = get("user", "/users").param("id", ParamRole::Path);
        let err = validate_contract("Api", None, &[m]).unwrap_err();
        assert!(reason(err).contains("has no placeholder"));
    }

    #[test]
    fn rejects_relative_base_address() {
        let err = validate_contract("Api", Some("/v1"), &[get("home", "/")]).unwrap_err();
        assert!(matches!(err, ApiError::InvalidContract { .. }));
    }

    #[test]
    fn body_on_get_is_unsupported() {
        let m = get("search", "/search").param("filter", ParamRole::Body);
        let err = validate_contract("Api", None, &[m]).unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedType { .. }));
    }

    #[test]
    fn custom_verb_is_unsupported() {
        let verb = Method::from_bytes(b"PURGE").unwrap();
        let m = MethodDescriptor::new("purge", verb, "/", ReturnShape::Detached);
        let err = validate_contract("Api", None, &[m]).unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedType { .. }));
    }
}

//! Contract metadata.
//!
//! A contract is described as data: an [`InterfaceDescriptor`] listing its
//! methods, each with its verb, path template, parameters and return shape.

use reqwest::Method;
use std::collections::HashMap;
use std::sync::Arc;

/// How a parameter contributes to the wire request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamRole {
    /// Substituted into a `{name}` placeholder of the path template.
    Path,
    /// Appended to the query string.
    Query,
    /// Sent as a request header.
    Header,
    /// Serialized as the JSON request body.
    Body,
}

/// How a method hands its outcome back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    /// Block the caller until the value is available.
    Blocking,
    /// Return a pending handle immediately.
    Pending,
    /// Fire and forget; the outcome is never returned.
    Detached,
}

/// A declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDescriptor {
    pub name: &'static str,
    pub role: ParamRole,
}

/// A declared method: one logical endpoint.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    pub name: &'static str,
    pub verb: Method,
    /// Relative (`/items/{id}`) or absolute (`https://host/items/{id}`).
    pub path: &'static str,
    pub params: Vec<ParamDescriptor>,
    pub shape: ReturnShape,
}

impl MethodDescriptor {
    pub fn new(name: &'static str, verb: Method, path: &'static str, shape: ReturnShape) -> Self {
        Self {
            name,
            verb,
            path,
            params: Vec::new(),
            shape,
        }
    }

    /// Declare the next parameter.
    pub fn param(mut self, name: &'static str, role: ParamRole) -> Self {
        self.params.push(ParamDescriptor { name, role });
        self
    }

    /// Parameters with the given role, in declaration order.
    pub fn params_with(&self, role: ParamRole) -> impl Iterator<Item = &ParamDescriptor> {
        self.params.iter().filter(move |p| p.role == role)
    }

    /// Names of the `{placeholder}` segments in the path template.
    pub fn placeholders(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let mut rest = self.path;
        while let Some(start) = rest.find('{') {
            let after = &rest[start + 1..];
            match after.find('}') {
                Some(end) => {
                    names.push(&after[..end]);
                    rest = &after[end + 1..];
                }
                None => break,
            }
        }
        names
    }

    /// True if the path template carries its own scheme and host.
    pub fn is_absolute(&self) -> bool {
        self.path.starts_with("http://") || self.path.starts_with("https://")
    }
}

/// Immutable metadata for one contract type.
#[derive(Debug)]
pub struct InterfaceDescriptor {
    name: &'static str,
    base_address: Option<&'static str>,
    methods: HashMap<&'static str, Arc<MethodDescriptor>>,
    order: Vec<&'static str>,
}

impl InterfaceDescriptor {
    /// Assemble a descriptor; callers validate it first.
    pub(crate) fn new(
        name: &'static str,
        base_address: Option<&'static str>,
        methods: Vec<MethodDescriptor>,
    ) -> Self {
        let order = methods.iter().map(|m| m.name).collect();
        let methods = methods.into_iter().map(|m| (m.name, Arc::new(m))).collect();
        Self {
            name,
            base_address,
            methods,
            order,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Contract-level default destination, if any.
    pub fn base_address(&self) -> Option<&'static str> {
        self.base_address
    }

    /// Resolve a method by name.
    pub fn method(&self, name: &str) -> Option<&Arc<MethodDescriptor>> {
        self.methods.get(name)
    }

    /// Methods in declaration order.
    pub fn methods(&self) -> impl Iterator<Item = &Arc<MethodDescriptor>> {
        self.order.iter().filter_map(move |name| self.methods.get(name))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

//! Parameter descriptor extraction
//!
//! Turns a handler's declared parameter list into the binding plan the
//! resolver walks on every request. This runs once per route, while the route
//! table is built; requests only resolve values for an already fixed plan.
//!
//! Reserved names are recognized here so the resolver never compares strings
//! for them: `req` becomes [`ParamBinding::Request`] and `res` becomes
//! [`ParamBinding::Response`]. Header lookup keys are lower-cased up front.

use routebind_core::{
    Error, HandlerDescriptor, ParamKind, ParamSpec, Result, REQUEST_PARAM, RESPONSE_PARAM,
};
use std::collections::HashSet;

/// How one declared parameter is bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamBinding {
    /// `req`: the raw request
    Request,
    /// `res`: the raw response; the handler takes over response writing
    Response,
    /// Any other name: context first, then the descriptor's source
    Field {
        name: String,
        kind: ParamKind,
        /// Lower-cased name used for header lookups
        header_key: String,
    },
}

impl ParamBinding {
    pub fn name(&self) -> &str {
        match self {
            Self::Request => REQUEST_PARAM,
            Self::Response => RESPONSE_PARAM,
            Self::Field { name, .. } => name,
        }
    }
}

/// Build the binding plan for one handler
///
/// Order and count of `params` are preserved. Fails with
/// [`Error::Registration`] on an unusable handler name, an empty parameter
/// name, or a parameter declared twice.
pub fn extract(descriptor: &HandlerDescriptor, params: &[ParamSpec]) -> Result<Vec<ParamBinding>> {
    validate_handler_name(descriptor)?;

    let mut seen = HashSet::with_capacity(params.len());
    params
        .iter()
        .map(|spec| {
            if spec.name.trim().is_empty() {
                return Err(Error::Registration(format!(
                    "{} declares a parameter with an empty name",
                    descriptor.qualified_name()
                )));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(Error::Registration(format!(
                    "{} declares parameter {} more than once",
                    descriptor.qualified_name(),
                    spec.name
                )));
            }
            Ok(match spec.name.as_str() {
                REQUEST_PARAM => ParamBinding::Request,
                RESPONSE_PARAM => ParamBinding::Response,
                name => ParamBinding::Field {
                    name: name.to_string(),
                    kind: spec.kind,
                    header_key: name.to_ascii_lowercase(),
                },
            })
        })
        .collect()
}

fn validate_handler_name(descriptor: &HandlerDescriptor) -> Result<()> {
    let name = &descriptor.name;
    if name.is_empty() {
        return Err(Error::Registration(format!(
            "handler in scope '{}' has an empty name",
            descriptor.scope
        )));
    }
    if name.contains('/') || name.chars().any(char::is_whitespace) {
        return Err(Error::Registration(format!(
            "handler name '{}' cannot be used as a path segment",
            name
        )));
    }
    Ok(())
}

//! Parameter source resolver
//!
//! Resolves one declared parameter for one request. First match wins:
//!
//! 1. `req` binds the request itself
//! 2. `res` binds the response and hands response writing to the handler
//! 3. a key already present in the request [`Context`](crate::Context) binds
//!    that value raw, with no coercion
//! 4. the descriptor's single configured source (query, body or headers),
//!    then coercion per the declared [`ParamKind`](routebind_core::ParamKind)
//!
//! There is no implicit search across sources. A name absent from the
//! configured source is a missing parameter even if another source has it.
//!
//! Resolution is synchronous and never awaits.

use crate::bind::{Bound, BoundArgs};
use crate::descriptor::ParamBinding;
use crate::request::Request;
use crate::response::ResponseHandle;
use routebind_core::{coerce, Error, HandlerDescriptor, ParamSource, ParamValue, Result};

/// Arguments for one call plus whether `res` was bound
#[derive(Debug)]
pub struct Resolved {
    pub args: BoundArgs,
    /// The handler writes its own response; the dispatcher stays silent
    pub controls_response: bool,
}

/// Resolve a single parameter
pub fn resolve(
    binding: &ParamBinding,
    descriptor: &HandlerDescriptor,
    request: &Request,
    response: &ResponseHandle,
) -> Result<Bound> {
    match binding {
        ParamBinding::Request => Ok(Bound::Request(request.clone())),
        ParamBinding::Response => Ok(Bound::Response(response.clone())),
        ParamBinding::Field {
            name,
            kind,
            header_key,
        } => {
            if let Some(value) = request.context().get(name) {
                return Ok(Bound::Value(ParamValue::Raw(value)));
            }

            let raw = match descriptor.source {
                ParamSource::Headers => request.header_field(header_key),
                source => request.field(source, name),
            }
            .ok_or_else(|| Error::missing(name, descriptor.qualified_name()))?;

            coerce(name, *kind, raw).map(Bound::Value)
        }
    }
}

/// Resolve every parameter in declaration order, stopping at the first failure
pub fn resolve_all(
    bindings: &[ParamBinding],
    descriptor: &HandlerDescriptor,
    request: &Request,
    response: &ResponseHandle,
) -> Result<Resolved> {
    let mut args = BoundArgs::new();
    let mut controls_response = false;

    for binding in bindings {
        let bound = resolve(binding, descriptor, request, response)?;
        if matches!(bound, Bound::Response(_)) {
            controls_response = true;
        }
        args.push(binding.name(), bound);
    }

    Ok(Resolved {
        args,
        controls_response,
    })
}

//! Dispatcher
//!
//! Invokes a handler with its resolved arguments and acts on the result:
//!
//! - handler bound `res`: nothing is written, success or failure
//! - middleware step: the result is published into the request context and
//!   the pipeline continues with [`Next`]
//! - otherwise: `200` with the result as the JSON body
//!
//! A failed handler produces `{"error": message}` with the error's status, or
//! 500. If the response was already partly sent, [`write_error`] falls back
//! to writing the same JSON as a raw chunk and ending the stream. Nothing in
//! this module returns an error: per-request failures end here.

use crate::handler::Handler;
use crate::request::Context;
use crate::resolver::Resolved;
use crate::response::ResponseHandle;
use crate::router::Next;
use routebind_core::{Error, ErrorBody, HandlerDescriptor, MiddlewareOutput};
use serde_json::Value;

/// How one dispatch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Handler succeeded and answered (or let its own `res` write answer)
    Ok,
    /// Middleware step succeeded and continued the pipeline
    Middleware,
    /// Parameter binding failed, the handler never ran
    BadRequest,
    /// Handler returned an error
    HandlerError,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Middleware => "middleware",
            Self::BadRequest => "bad_request",
            Self::HandlerError => "handler_error",
        }
    }
}

/// Run `handler` and write or forward its result
pub async fn dispatch(
    handler: &dyn Handler,
    resolved: Resolved,
    descriptor: &HandlerDescriptor,
    context: &Context,
    response: &ResponseHandle,
    next: Next,
) -> Outcome {
    let Resolved {
        args,
        controls_response,
    } = resolved;

    match handler.call(args).await {
        Ok(_) if controls_response => {
            tracing::trace!("Handler wrote its own response");
            Outcome::Ok
        }
        Ok(value) => match &descriptor.output {
            Some(output) => {
                publish(context, output, value, descriptor);
                next.run().await;
                Outcome::Middleware
            }
            None => {
                write_json(response, 200, &value);
                Outcome::Ok
            }
        },
        Err(e) if controls_response => {
            tracing::error!(error = %e, "Handler failed after taking over the response");
            Outcome::HandlerError
        }
        Err(e) => {
            tracing::debug!(status = e.http_status(), error = %e, "Handler failed");
            report_error(response, &e);
            Outcome::HandlerError
        }
    }
}

/// Copy a middleware result into the request context
///
/// A `null` result publishes nothing. In merge mode only object results have
/// fields to merge; anything else is dropped with a warning.
fn publish(
    context: &Context,
    output: &MiddlewareOutput,
    value: Value,
    descriptor: &HandlerDescriptor,
) {
    match (output, value) {
        (_, Value::Null) => {}
        (MiddlewareOutput::Key(key), value) => context.insert(key.clone(), value),
        (MiddlewareOutput::Merge, Value::Object(fields)) => context.merge(fields),
        (MiddlewareOutput::Merge, other) => {
            tracing::warn!(
                handler = %descriptor.qualified_name(),
                result = %other,
                "Middleware result is not an object, nothing merged"
            );
        }
    }
}

/// Write `{"error": message}` with `status`, never failing
///
/// When the status or JSON write is refused the same payload is sent as a
/// raw chunk and the stream is ended; errors from that fallback are logged
/// and dropped.
pub fn write_error(response: &ResponseHandle, status: u16, message: &str) {
    write_json(response, status, &ErrorBody::new(message).to_value());
}

/// [`write_error`] with the status and body `error` maps to
pub fn report_error(response: &ResponseHandle, error: &Error) {
    write_json(response, error.http_status(), &error.to_body().to_value());
}

fn write_json(response: &ResponseHandle, status: u16, body: &Value) {
    let Err(e) = response.status(status).and_then(|_| response.json(body)) else {
        return;
    };
    tracing::warn!(error = %e, status = status, "Response write refused, sending raw body");

    let payload = match serde_json::to_vec(body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response body");
            return;
        }
    };
    if let Err(e) = response.send_raw(&payload) {
        tracing::error!(error = %e, "Raw response write failed");
    }
    if let Err(e) = response.end() {
        tracing::error!(error = %e, "Failed to end response");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{BufferedResponse, ResponseSink};
    use routebind_core::{ParamKind, Result};
    use serde_json::json;

    #[test]
    fn test_write_error() {
        let (response, buffer) = BufferedResponse::handle();
        write_error(&response, 404, "not found");

        assert_eq!(buffer.status_code(), 404);
        assert_eq!(buffer.body_json(), Some(json!({"error": "not found"})));
    }

    #[test]
    fn test_write_error_falls_back_to_raw_chunk() {
        let (response, buffer) = BufferedResponse::handle();
        response.send_raw(b"partial;").unwrap();

        write_error(&response, 500, "boom");

        assert_eq!(buffer.status_code(), 200);
        assert_eq!(buffer.body_bytes(), b"partial;{\"error\":\"boom\"}".to_vec());
        assert!(buffer.is_ended());
    }

    #[test]
    fn test_report_error_uses_error_status() {
        let (response, buffer) = BufferedResponse::handle();
        report_error(&response, &Error::validation("id", ParamKind::ObjectId));
        assert_eq!(buffer.status_code(), 400);
        assert_eq!(
            buffer.body_json(),
            Some(json!({"error": "Parameter id should be a valid ObjectId"}))
        );

        let (response, buffer) = BufferedResponse::handle();
        report_error(&response, &Error::handler("boom"));
        assert_eq!(buffer.status_code(), 500);
        assert_eq!(buffer.body_json(), Some(json!({"error": "boom"})));
    }

    struct ClosedSink;

    impl ResponseSink for ClosedSink {
        fn set_status(&mut self, _status: u16) -> Result<()> {
            Err(Error::Response("closed".into()))
        }

        fn write_json(&mut self, _body: &Value) -> Result<()> {
            Err(Error::Response("closed".into()))
        }

        fn write_raw(&mut self, _chunk: &[u8]) -> Result<()> {
            Err(Error::Response("closed".into()))
        }

        fn end(&mut self) -> Result<()> {
            Err(Error::Response("closed".into()))
        }

        fn headers_sent(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_write_error_never_fails() {
        let response = ResponseHandle::new(ClosedSink);
        write_error(&response, 500, "boom");
        assert!(response.headers_sent());
    }

    #[test]
    fn test_publish_modes() {
        let descriptor = HandlerDescriptor::new("s", "auth", routebind_core::Verb::Use);
        let context = Context::new();

        publish(&context, &MiddlewareOutput::Merge, json!({"user": "u1"}), &descriptor);
        publish(&context, &MiddlewareOutput::Key("session".into()), json!({"id": 3}), &descriptor);
        publish(&context, &MiddlewareOutput::Merge, json!("scalar"), &descriptor);
        publish(&context, &MiddlewareOutput::Key("ignored".into()), Value::Null, &descriptor);

        assert_eq!(context.get("user"), Some(json!("u1")));
        assert_eq!(context.get("session"), Some(json!({"id": 3})));
        assert!(!context.contains("ignored"));
        assert_eq!(context.len(), 2);
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(Outcome::Ok.as_str(), "ok");
        assert_eq!(Outcome::BadRequest.as_str(), "bad_request");
    }
}

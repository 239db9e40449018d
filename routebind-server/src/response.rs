//! Response abstraction consumed by the dispatcher
//!
//! A transport plugs in by implementing [`ResponseSink`]. The dispatcher and
//! handlers that bind `res` only ever talk to the shared [`ResponseHandle`].
//!
//! [`BufferedResponse`] is an in-memory sink that records what was written.
//! It behaves like a real stream in the one way that matters here: once
//! anything has been sent, status and JSON writes are refused and only raw
//! chunks may still be appended until the stream is ended.

use parking_lot::Mutex;
use routebind_core::{Error, Result};
use serde_json::Value;
use std::sync::Arc;

/// Write side of one HTTP response
pub trait ResponseSink: Send {
    /// Set the status code; fails once headers are sent
    fn set_status(&mut self, status: u16) -> Result<()>;

    /// Send `body` as the complete JSON response; fails once headers are sent
    fn write_json(&mut self, body: &Value) -> Result<()>;

    /// Append a raw body chunk; fails once the stream is ended
    fn write_raw(&mut self, chunk: &[u8]) -> Result<()>;

    /// Terminate the stream
    fn end(&mut self) -> Result<()>;

    fn headers_sent(&self) -> bool;
}

/// Shared handle to a response sink
///
/// Cloned into the dispatcher and into handlers that declare `res`.
#[derive(Clone)]
pub struct ResponseHandle {
    sink: Arc<Mutex<Box<dyn ResponseSink>>>,
}

impl ResponseHandle {
    pub fn new(sink: impl ResponseSink + 'static) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Box::new(sink))),
        }
    }

    pub fn status(&self, status: u16) -> Result<()> {
        self.sink.lock().set_status(status)
    }

    pub fn json(&self, body: &Value) -> Result<()> {
        self.sink.lock().write_json(body)
    }

    pub fn send_raw(&self, chunk: &[u8]) -> Result<()> {
        self.sink.lock().write_raw(chunk)
    }

    pub fn end(&self) -> Result<()> {
        self.sink.lock().end()
    }

    pub fn headers_sent(&self) -> bool {
        self.sink.lock().headers_sent()
    }
}

impl std::fmt::Debug for ResponseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseHandle")
            .field("headers_sent", &self.headers_sent())
            .finish()
    }
}

#[derive(Debug)]
struct BufferedState {
    status: u16,
    body: Vec<u8>,
    headers_sent: bool,
    ended: bool,
}

/// In-memory response sink
///
/// Clones share the recorded state, so a caller can keep one clone to inspect
/// the response after handing another to [`ResponseHandle::new`].
#[derive(Debug, Clone)]
pub struct BufferedResponse {
    state: Arc<Mutex<BufferedState>>,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(BufferedState {
                status: 200,
                body: Vec::new(),
                headers_sent: false,
                ended: false,
            })),
        }
    }

    /// Convenience: a fresh buffer plus a handle writing into it
    pub fn handle() -> (ResponseHandle, BufferedResponse) {
        let buffer = Self::new();
        (ResponseHandle::new(buffer.clone()), buffer)
    }

    pub fn status_code(&self) -> u16 {
        self.state.lock().status
    }

    pub fn body_bytes(&self) -> Vec<u8> {
        self.state.lock().body.clone()
    }

    /// Body parsed as JSON, `None` if empty or not JSON
    pub fn body_json(&self) -> Option<Value> {
        let state = self.state.lock();
        if state.body.is_empty() {
            return None;
        }
        serde_json::from_slice(&state.body).ok()
    }

    pub fn is_ended(&self) -> bool {
        self.state.lock().ended
    }

    /// True if anything was sent (status line and headers went out)
    pub fn is_sent(&self) -> bool {
        self.state.lock().headers_sent
    }
}

impl Default for BufferedResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseSink for BufferedResponse {
    fn set_status(&mut self, status: u16) -> Result<()> {
        let mut state = self.state.lock();
        if state.headers_sent {
            return Err(Error::Response("headers already sent".to_string()));
        }
        state.status = status;
        Ok(())
    }

    fn write_json(&mut self, body: &Value) -> Result<()> {
        let mut state = self.state.lock();
        if state.headers_sent {
            return Err(Error::Response("headers already sent".to_string()));
        }
        state.body = serde_json::to_vec(body)?;
        state.headers_sent = true;
        state.ended = true;
        Ok(())
    }

    fn write_raw(&mut self, chunk: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        if state.ended {
            return Err(Error::Response("stream already ended".to_string()));
        }
        state.body.extend_from_slice(chunk);
        state.headers_sent = true;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.headers_sent = true;
        state.ended = true;
        Ok(())
    }

    fn headers_sent(&self) -> bool {
        self.state.lock().headers_sent
    }
}

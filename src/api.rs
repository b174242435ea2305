//! Process-global facade with status codes.
//!
//! Mirrors the [`Runtime`] operations over one global instance for callers
//! that want the flat, status-code style of the boundary API. Failures
//! return a [`Status`] and store the error message in a thread-local slot
//! read by [`last_error`]. The slot keeps the most recent failure until the
//! next one on the same thread.
//!
//! # Beispiel
//!
//! ```
//! use v2gcodec::api::{self, Status};
//!
//! assert_eq!(api::encode_xml("<a/>"), Err(Status::Initialization));
//! assert!(api::last_error().unwrap().contains("not initialized"));
//! assert_eq!(api::message_type_name(35), "SessionSetupReq");
//! assert_eq!(api::message_type_name(999), "Unknown(999)");
//! ```

use std::cell::RefCell;
use std::path::Path;
use std::sync::LazyLock;

use crate::message::MessageType;
use crate::runtime::Runtime;
use crate::{Error, ErrorKind, Result};

static RUNTIME: LazyLock<Runtime> = LazyLock::new(Runtime::new);

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Result code of a facade call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Status {
    Ok = 0,
    Initialization = 1,
    Shutdown = 2,
    InvalidArgument = 3,
    Encode = 4,
    Decode = 5,
    Schema = 6,
    OutOfMemory = 7,
    Internal = 254,
}

impl Status {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<ErrorKind> for Status {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Initialization => Self::Initialization,
            ErrorKind::Shutdown => Self::Shutdown,
            ErrorKind::InvalidArgument => Self::InvalidArgument,
            ErrorKind::Encode => Self::Encode,
            ErrorKind::Decode => Self::Decode,
            ErrorKind::Schema => Self::Schema,
            ErrorKind::OutOfMemory => Self::OutOfMemory,
            ErrorKind::Internal => Self::Internal,
        }
    }
}

/// The global runtime behind the facade.
pub fn runtime() -> &'static Runtime {
    &RUNTIME
}

fn record<T>(result: Result<T>) -> std::result::Result<T, Status> {
    result.map_err(|err| {
        log::debug!("api call failed: {err}");
        let status = Status::from(err.kind());
        LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(err.to_string()));
        status
    })
}

fn status(result: Result<()>) -> Status {
    match record(result) {
        Ok(()) => Status::Ok,
        Err(status) => status,
    }
}

pub fn initialize() -> Status {
    status(RUNTIME.initialize())
}

pub fn shutdown() -> Status {
    status(RUNTIME.shutdown())
}

pub fn register_schemas<P: AsRef<Path>>(paths: &[P]) -> Status {
    status(RUNTIME.register_schemas(paths))
}

pub fn set_option(name: &str, value: &str) -> Status {
    status(RUNTIME.set_option(name, value))
}

pub fn encode_xml(xml: &str) -> std::result::Result<Vec<u8>, Status> {
    record(RUNTIME.encode_xml(xml))
}

pub fn decode_exi(exi: &[u8]) -> std::result::Result<String, Status> {
    record(RUNTIME.decode_exi(exi))
}

/// `message_type` is the numeric id; unknown ids are
/// [`Status::InvalidArgument`].
pub fn encode_struct(message_type: i32, json: &[u8]) -> std::result::Result<Vec<u8>, Status> {
    record(message(message_type).and_then(|m| RUNTIME.encode_struct(m, json)))
}

pub fn decode_struct(message_type: i32, exi: &[u8]) -> std::result::Result<Vec<u8>, Status> {
    record(message(message_type).and_then(|m| RUNTIME.decode_struct(m, exi)))
}

fn message(id: i32) -> Result<MessageType> {
    MessageType::try_from(id)
}

pub fn message_type_name(message_type: i32) -> String {
    crate::message::message_type_name(message_type)
}

/// Message of the most recent failed call on this thread.
pub fn last_error() -> Option<String> {
    LAST_ERROR.with(|slot| slot.borrow().clone())
}

pub fn version() -> &'static str {
    crate::runtime::version()
}

/// Status of an arbitrary library error, for callers that mix the facade
/// with [`Runtime`] calls.
pub fn status_of(err: &Error) -> Status {
    Status::from(err.kind())
}

//! API module
//!
//! Contains command parsing, dispatch and the HTTP request handlers

pub mod command;
pub mod dispatcher;
pub mod handlers;

pub use command::Command;
pub use dispatcher::{dispatch, DispatchResponse};

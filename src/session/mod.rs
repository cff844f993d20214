//! Controller CLI sessions.
//!
//! The rest of the crate talks to the controller only through
//! [`DeviceSession`]: connect, send a command, send configuration lines,
//! disconnect. [`SshSession`] is the real implementation; [`ReplaySession`]
//! answers from a recording so harvests and mutations can be exercised
//! without a controller.
//!
//! # Main Components
//!
//! - [`DeviceSession`] / [`SessionFactory`] - the session capability
//! - [`SshSession`] - SSH shell session with prompt tracking
//! - [`SessionRecorder`] / [`ReplaySession`] - recording and offline replay

use std::borrow::Cow;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_ssh2_tokio::client::{AuthMethod, Client};
use async_ssh2_tokio::{Config, ServerCheckMethod};
use log::{debug, trace, warn};
use russh::{ChannelMsg, Preferred};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, Receiver, Sender};

use crate::config::{self, ControllerConfig};
use crate::device::{DeviceHandler, IGNORE_START_LINE};
use crate::error::WlcError;
use crate::templates;

pub use client::{SshSession, SshSessionFactory};
pub use recording::{
    ReplayFactory, ReplaySession, SessionEvent, SessionRecordEntry, SessionRecordLevel,
    SessionRecorder,
};
pub use security::{ConnectionSecurityOptions, SecurityLevel};

/// A text command session against the controller.
///
/// Each call is one blocking round-trip from the caller's point of view.
/// A session runs one command at a time; callers needing concurrency open
/// more sessions.
pub trait DeviceSession: Send + 'static {
    /// Establishes the session, trying up to `max_retries` times (at least
    /// once).
    fn connect(&mut self, max_retries: u32) -> impl Future<Output = Result<(), WlcError>> + Send;

    /// Runs one command and returns its output without echo or prompt.
    fn send_command(
        &mut self,
        command: &str,
    ) -> impl Future<Output = Result<String, WlcError>> + Send;

    /// Runs configuration lines in order and returns their combined output.
    fn send_config_lines(
        &mut self,
        lines: &[String],
    ) -> impl Future<Output = Result<String, WlcError>> + Send;

    /// Tears the session down. Never fails; problems are logged.
    fn disconnect(&mut self) -> impl Future<Output = ()> + Send;

    fn is_connected(&self) -> bool;
}

/// Produces fresh, unconnected sessions against one controller.
pub trait SessionFactory: Send + Sync + 'static {
    type Session: DeviceSession;

    fn create(&self) -> Self::Session;
}

/// The output result of a command execution.
#[derive(Debug, Clone, Default)]
pub struct Output {
    /// False when the controller printed an error line.
    pub success: bool,
    /// Output without the echoed command and trailing prompt.
    pub content: String,
    /// Everything the shell printed.
    pub all: String,
    /// Prompt captured after the command.
    pub prompt: Option<String>,
}

mod client;
mod recording;
mod security;

//! Error handling for the brick graph runtime
//!
//! Every fallible operation returns [`Result`]. An [`Error`] wraps an
//! [`ErrorKind`] together with the source location that raised it and, when
//! the failure came from the OS, its errno. Errors are plain values: they
//! travel up the burst call stack, through the poller and onto a scheduler
//! thread's error stack without ever unwinding.

use crate::graph::brick::BrickKind;
use crate::graph::id::{BrickId, GraphId, ThreadId};
use crate::graph::side::Side;
use std::fmt;
use std::panic::Location;
use thiserror::Error;

/// Coarse grouping of error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Topology,
    Burst,
    Resource,
    Scheduling,
    Config,
}

/// What went wrong.
#[derive(Error, Debug)]
pub enum ErrorKind {
    // ── Topology ──
    /// A side already holds as many edges as it was created with.
    #[error("brick '{brick}' {side} side is full (capacity {capacity})")]
    SideFull {
        brick: String,
        side: Side,
        capacity: usize,
    },

    /// Linking would break the arity rule of the brick kind.
    #[error("{kind:?} brick '{brick}' cannot take another edge on its {side} side")]
    KindViolation {
        brick: String,
        kind: BrickKind,
        side: Side,
    },

    #[error("'{west}' is already linked to '{east}'")]
    AlreadyLinked { west: String, east: String },

    #[error("brick '{0}' cannot be linked to itself")]
    SelfLink(String),

    #[error("unknown brick {0:?}")]
    UnknownBrick(BrickId),

    #[error("brick '{brick}' is not a {expected}")]
    WrongVariant {
        brick: String,
        expected: &'static str,
    },

    #[error("queue '{0}' already has a friend")]
    AlreadyFriend(String),

    // ── Burst ──
    #[error("burst of {0} packets exceeds the 64 slot limit")]
    Oversized(usize),

    #[error("mask {mask:#018x} marks empty slots (occupied {occupied:#018x})")]
    MalformedMask { mask: u64, occupied: u64 },

    #[error("brick '{0}' does not accept bursts")]
    NotReceiver(String),

    #[error("brick '{0}' is not pollable")]
    NotPollable(String),

    #[error("brick '{0}' re-entered while already forwarding")]
    Reentrant(String),

    /// Failure reported by a brick implementation.
    #[error("brick '{brick}': {message}")]
    Brick { brick: String, message: String },

    // ── Resource ──
    #[error("packet pool exhausted ({capacity} buffers in use)")]
    PoolExhausted { capacity: usize },

    #[error("packet of {len} bytes exceeds buffer size {buffer_size}")]
    BufferTooLarge { len: usize, buffer_size: usize },

    // ── Scheduling ──
    #[error("thread limit reached ({0} threads)")]
    ThreadLimit(usize),

    #[error("invalid thread {0:?}")]
    InvalidThread(ThreadId),

    #[error("thread {thread:?} has no graph {graph:?}")]
    InvalidGraph { thread: ThreadId, graph: GraphId },

    #[error("command queue of thread {0:?} is full")]
    CommandQueueFull(ThreadId),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),

    // ── Config ──
    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ErrorKind>,
    },
}

impl ErrorKind {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ErrorKind::SideFull { .. }
            | ErrorKind::KindViolation { .. }
            | ErrorKind::AlreadyLinked { .. }
            | ErrorKind::SelfLink(_)
            | ErrorKind::UnknownBrick(_)
            | ErrorKind::WrongVariant { .. }
            | ErrorKind::AlreadyFriend(_) => ErrorCategory::Topology,
            ErrorKind::Oversized(_)
            | ErrorKind::MalformedMask { .. }
            | ErrorKind::NotReceiver(_)
            | ErrorKind::NotPollable(_)
            | ErrorKind::Reentrant(_)
            | ErrorKind::Brick { .. } => ErrorCategory::Burst,
            ErrorKind::PoolExhausted { .. }
            | ErrorKind::BufferTooLarge { .. }
            | ErrorKind::Io(_) => ErrorCategory::Resource,
            ErrorKind::ThreadLimit(_)
            | ErrorKind::InvalidThread(_)
            | ErrorKind::InvalidGraph { .. }
            | ErrorKind::CommandQueueFull(_)
            | ErrorKind::Spawn(_) => ErrorCategory::Scheduling,
            ErrorKind::Config(_) => ErrorCategory::Config,
            ErrorKind::WithContext { source, .. } => source.category(),
        }
    }
}

/// Error value carrying its origin.
#[derive(Error)]
#[error("{kind}")]
pub struct Error {
    kind: ErrorKind,
    location: &'static Location<'static>,
    errno: Option<i32>,
}

impl Error {
    #[track_caller]
    pub fn new(kind: ErrorKind) -> Self {
        let errno = match &kind {
            ErrorKind::Io(e) => e.raw_os_error(),
            _ => None,
        };
        Self {
            kind,
            location: Location::caller(),
            errno,
        }
    }

    /// Error raised by a brick implementation.
    #[track_caller]
    pub fn brick(brick: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Brick {
            brick: brick.into(),
            message: message.into(),
        })
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    pub fn file(&self) -> &'static str {
        self.location.file()
    }

    pub fn line(&self) -> u32 {
        self.location.line()
    }

    pub fn errno(&self) -> Option<i32> {
        self.errno
    }

    /// Add context to an error, keeping its original location.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::WithContext {
                context: context.into(),
                source: Box::new(self.kind),
            },
            location: self.location,
            errno: self.errno,
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}:{})",
            self.kind,
            self.location.file(),
            self.location.line()
        )?;
        if let Some(errno) = self.errno {
            write!(f, " [errno {}]", errno)?;
        }
        Ok(())
    }
}

impl From<ErrorKind> for Error {
    #[track_caller]
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

impl From<std::io::Error> for Error {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        Error::new(ErrorKind::Io(err))
    }
}

/// Result type alias for brick graph operations
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

use thiserror::Error;

/// Caller bugs detected by the editor.
///
/// A misuse never aborts the frame: the offending call does nothing (or takes
/// the closest graceful fallback), the condition is logged at `warn` level and
/// recorded for [`EditorContext::take_diagnostics`](crate::EditorContext::take_diagnostics).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Misuse {
    #[error("{kind} id is the invalid sentinel")]
    InvalidId { kind: &'static str },
    #[error("begin_frame called while a frame is open")]
    NestedBegin,
    #[error("{call} called outside begin_frame/end_frame")]
    OutsideFrame { call: &'static str },
    #[error("{call} called outside a node bracket")]
    OutsideNode { call: &'static str },
    #[error("end_pin called without a matching begin_pin")]
    OutsidePin,
    #[error("begin_node for {id} while node {open} is still open")]
    NestedNode { id: String, open: String },
    #[error("begin_pin for {id} while pin {open} is still open")]
    NestedPin { id: String, open: String },
    #[error("node {0} was never closed with end_node")]
    UnclosedNode(String),
    #[error("pin {0} was never closed with end_pin")]
    UnclosedPin(String),
    #[error("{vars} style vars and {colors} style colors still pushed at end_frame")]
    UnbalancedStyle { vars: usize, colors: usize },
    #[error("pop of {count} {what} with only {depth} pushed")]
    StylePopUnderflow { what: &'static str, count: usize, depth: usize },
    #[error("resume called without a matching suspend")]
    ResumeWithoutSuspend,
    #[error("link {link} connects pin {pin} to itself")]
    SelfLink { link: String, pin: String },
    #[error("link {link} connects two pins of node {node}")]
    SameNodeLink { link: String, node: String },
    #[error("pending change from frame {issued} used in frame {current}")]
    StaleChange { issued: u64, current: u64 },
    #[error("{kind} {id} is not known to the editor")]
    UnknownObject { kind: &'static str, id: String },
}

/// Failure inside the settings bridge. Never escapes the editor: it is logged
/// and the in-memory state is kept.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings blob is empty")]
    Empty,
    #[error("malformed settings: {0}")]
    Json(#[from] serde_json::Error),
    #[error("settings file: {0}")]
    Io(#[from] std::io::Error),
}

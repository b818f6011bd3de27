use thiserror::Error;

/// Failures surfaced by a [`StateStore`](crate::session::StateStore).
///
/// Domain conditions (no pair available, malformed ledger entries) never
/// produce these; only the storage medium does.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("state could not be serialized: {0}")]
    Serialize(String),
}

/// An unrecognized label for one of the selection or vote enums.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} \"{label}\"")]
pub struct ParseLabelError {
    pub kind: &'static str,
    pub label: String,
}

impl ParseLabelError {
    pub(crate) fn new(kind: &'static str, label: &str) -> Self {
        ParseLabelError {
            kind,
            label: label.to_string(),
        }
    }
}

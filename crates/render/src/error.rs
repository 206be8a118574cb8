//! Paint error types

/// Errors reported by a paint operation.
///
/// `Cancelled` is an expected outcome (the task was superseded or its item left
/// the visible set) and is never surfaced as a failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PaintError {
    #[error("paint cancelled")]
    Cancelled,

    #[error("paint failed for item {index}: {message}")]
    Failed { index: usize, message: String },
}

impl PaintError {
    /// Create a failure for `index` with a collaborator-supplied message
    pub fn failed(index: usize, message: impl Into<String>) -> Self {
        Self::Failed { index, message: message.into() }
    }

    /// Whether this error is the silent cancellation case
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PaintError::Cancelled)
    }
}

pub type PaintResult<T> = Result<T, PaintError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_is_distinguishable() {
        assert!(PaintError::Cancelled.is_cancelled());
        assert!(!PaintError::failed(3, "decoder crashed").is_cancelled());
    }

    #[test]
    fn failure_message_names_item() {
        let err = PaintError::failed(7, "bad stream");
        assert_eq!(err.to_string(), "paint failed for item 7: bad stream");
    }
}

//! Errors produced while compiling a track description.
//!
//! Every failure aborts the compile. Variants that originate from a single
//! input record carry its 1-based line number.

/// Errors that can occur while compiling a track.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    // -- parse ------------------------------------------------------------
    #[error("line {line}: {reason}: `{content}`")]
    Parse {
        line: usize,
        content: String,
        reason: &'static str,
    },

    // -- names ------------------------------------------------------------
    #[error("line {line}: duplicate node name '{name}'")]
    DuplicateNodeName { name: String, line: usize },

    #[error("line {line}: sensor address {address} of '{name}' is already used by '{existing}'")]
    DuplicateSensorAddress {
        address: u32,
        name: String,
        existing: String,
        line: usize,
    },

    #[error("line {line}: unknown node name '{name}'")]
    UnknownNodeName { name: String, line: usize },

    #[error("line {line}: no edge from '{src}' to '{dest}'")]
    UnknownEdge {
        src: String,
        dest: String,
        line: usize,
    },

    // -- graph consistency ------------------------------------------------
    #[error("line {line}: distance for nonexistent edge from '{src}' to '{dest}'")]
    OrphanDistance {
        src: String,
        dest: String,
        line: usize,
    },

    #[error("no distance declared for edge from '{src}' to '{dest}'")]
    MissingDistance { src: String, dest: String },

    #[error("edge from '{src}' to '{dest}' has no reverse edge from '{rev_src}' to '{rev_dest}'")]
    StrandedEdge {
        src: String,
        dest: String,
        rev_src: String,
        rev_dest: String,
    },

    #[error("edge {edge} claims source '{claimed}' but is owned by '{owner}'")]
    InternalEdgeOwnershipMismatch {
        edge: u32,
        claimed: String,
        owner: String,
    },

    #[error("reverse of reverse of '{name}' is '{got}'")]
    AsymmetricReverse { name: String, got: String },

    // -- calibration ------------------------------------------------------
    #[error("line {line}: invalid calibration cycle: {reason}")]
    InvalidCalibrationCycle { reason: String, line: usize },

    // -- capacity ---------------------------------------------------------
    #[error("line {line}: sensor '{name}' has address {address}, limit is {max}")]
    SensorAddressOutOfRange {
        name: String,
        address: u32,
        max: u32,
        line: usize,
    },

    #[error("track has {count} nodes, limit is {max}")]
    TooManyNodes { count: usize, max: usize },
}

impl CompileError {
    /// The input line the error points at, when it comes from one record.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Parse { line, .. }
            | Self::DuplicateNodeName { line, .. }
            | Self::DuplicateSensorAddress { line, .. }
            | Self::UnknownNodeName { line, .. }
            | Self::UnknownEdge { line, .. }
            | Self::OrphanDistance { line, .. }
            | Self::InvalidCalibrationCycle { line, .. }
            | Self::SensorAddressOutOfRange { line, .. } => Some(*line),
            Self::MissingDistance { .. }
            | Self::StrandedEdge { .. }
            | Self::InternalEdgeOwnershipMismatch { .. }
            | Self::AsymmetricReverse { .. }
            | Self::TooManyNodes { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_name_the_input() {
        let err = CompileError::OrphanDistance {
            src: "A1".into(),
            dest: "B7".into(),
            line: 12,
        };
        let msg = err.to_string();
        assert!(msg.contains("A1"), "got: {msg}");
        assert!(msg.contains("B7"), "got: {msg}");
        assert!(msg.starts_with("line 12"), "got: {msg}");

        let err = CompileError::Parse {
            line: 3,
            content: "bogus".into(),
            reason: "unrecognized record",
        };
        assert_eq!(err.to_string(), "line 3: unrecognized record: `bogus`");
    }

    #[test]
    fn line_is_reported_for_record_errors() {
        let err = CompileError::DuplicateNodeName {
            name: "X".into(),
            line: 4,
        };
        assert_eq!(err.line(), Some(4));

        let err = CompileError::MissingDistance {
            src: "X".into(),
            dest: "Y".into(),
        };
        assert_eq!(err.line(), None);
    }
}

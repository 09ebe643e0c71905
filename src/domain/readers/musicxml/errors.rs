//! Error and warning types for the MusicXML reader (§4.2, §7). Mirrors the
//! taxonomy used elsewhere in the pipeline: parse failures are fatal
//! ([`ImportError`]), semantic-mapping problems are either fatal
//! ([`MappingError`]) or recorded as non-fatal [`ImportWarning`]s, and a
//! final [`ConversionError`] wraps whichever of the two aborted the run.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WarningSeverity {
    Info,
    Minor,
    Major,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningCategory {
    UnsupportedElement,
    AmbiguousVoiceAssignment,
    BackupPastMeasureStart,
    UnrecognisedKeyMode,
    TruncatedDuration,
    MissingDivisions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportWarning {
    pub severity: WarningSeverity,
    pub category: WarningCategory,
    pub message: String,
    pub part_id: Option<String>,
    pub measure_number: Option<String>,
}

impl ImportWarning {
    pub fn new(category: WarningCategory, message: impl Into<String>) -> Self {
        Self {
            severity: WarningSeverity::Minor,
            category,
            message: message.into(),
            part_id: None,
            measure_number: None,
        }
    }

    pub fn with_severity(mut self, severity: WarningSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_part(mut self, part_id: impl Into<String>) -> Self {
        self.part_id = Some(part_id.into());
        self
    }

    pub fn with_measure(mut self, measure_number: impl Into<String>) -> Self {
        self.measure_number = Some(measure_number.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("malformed XML at byte {offset}: {message}")]
    Xml { offset: usize, message: String },
    #[error("'{0}' is not a valid MusicXML document (missing score-partwise/score-timewise root)")]
    NotMusicXml(String),
    #[error("failed to read .mxl container: {0}")]
    Archive(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("part '{0}' references an undeclared instrument")]
    UnknownInstrument(String),
    #[error("measure {0} has no <attributes><divisions> and none was inherited")]
    MissingDivisions(String),
    #[error("key signature fifths value {0} is out of the supported range")]
    KeyOutOfRange(i32),
    #[error("note duration could not be reconciled with its type")]
    IrreconcilableDuration,
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
}

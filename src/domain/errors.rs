//! Error taxonomy and diagnostics sink (§7).
//!
//! The core never writes a user-facing message itself: each error site
//! reports a `(severity, code, params)` tuple to a [`Diagnostics`] sink,
//! which is the pluggable "emission layer" of §7. `Diagnostics` tracks the
//! cumulative error count and promotes further recoverable errors to fatal
//! once a configurable maximum is exceeded.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a diagnostic, per the §7 taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Minor,
    Major,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Warning => "warning",
            Severity::Minor => "minor",
            Severity::Major => "major",
            Severity::Fatal => "fatal",
        };
        write!(f, "{s}")
    }
}

/// A single recorded diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub params: Vec<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.severity, self.code)?;
        if !self.params.is_empty() {
            write!(f, " ({})", self.params.join(", "))?;
        }
        if let Some(ref file) = self.file {
            write!(f, " at {file}")?;
            if let Some(line) = self.line {
                write!(f, ":{line}")?;
            }
        }
        Ok(())
    }
}

/// Library-level error type for operations that must abort outright
/// (fatal errors per §4.9, or a caller-visible `Result` boundary).
#[derive(Debug, thiserror::Error)]
pub enum EngraveError {
    #[error("out of memory")]
    OutOfMemory,
    #[error("draw-item stack overflow")]
    DrawStackOverflow,
    #[error("corrupt draw procedure pointer")]
    CorruptDrawProcedure,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("include/macro nesting too deep (limit {limit})")]
    NestingTooDeep { limit: u32 },
    #[error("chord has more than {max} notes")]
    ChordTooLarge { max: usize },
    #[error("too many errors: run aborted after {count} diagnostics")]
    TooManyErrors { count: usize },
    #[error("{0}")]
    Message(String),
}

/// Accumulates diagnostics for one engraving run and tracks the maximum
/// severity seen, promoting recoverable errors to fatal past a configurable
/// cumulative error count (§4.9 "past a configurable maximum").
#[derive(Debug, Default)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
    max_recoverable_errors: Option<usize>,
}

impl Diagnostics {
    pub fn new(max_recoverable_errors: Option<usize>) -> Self {
        Self {
            records: Vec::new(),
            max_recoverable_errors,
        }
    }

    /// Record a diagnostic. Returns `Err` if this push promoted the run to
    /// fatal (the caller should then abort).
    pub fn report(
        &mut self,
        severity: Severity,
        code: &'static str,
        params: Vec<String>,
        file: Option<String>,
        line: Option<u32>,
    ) -> Result<(), EngraveError> {
        let mut severity = severity;
        if severity < Severity::Fatal {
            if let Some(max) = self.max_recoverable_errors {
                if self.error_count() >= max {
                    severity = Severity::Fatal;
                }
            }
        }
        let fatal = severity == Severity::Fatal;
        self.records.push(Diagnostic {
            severity,
            code,
            params,
            file,
            line,
        });
        if fatal {
            return Err(EngraveError::TooManyErrors {
                count: self.records.len(),
            });
        }
        Ok(())
    }

    pub fn error_count(&self) -> usize {
        self.records
            .iter()
            .filter(|d| d.severity >= Severity::Minor)
            .count()
    }

    pub fn max_severity(&self) -> Option<Severity> {
        self.records.iter().map(|d| d.severity).max()
    }

    pub fn records(&self) -> &[Diagnostic] {
        &self.records
    }

    /// The stderr summary line contract of §7: count + maximum severity,
    /// with an explicit "no output produced" note at major-or-worse.
    pub fn summary_line(&self) -> String {
        match self.max_severity() {
            None => "0 diagnostics".to_string(),
            Some(sev) if sev >= Severity::Major => format!(
                "{} diagnostics, worst severity: {sev} — no output was produced",
                self.records.len()
            ),
            Some(sev) => format!("{} diagnostics, worst severity: {sev}", self.records.len()),
        }
    }
}

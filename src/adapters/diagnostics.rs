//! In-memory diagnostics collector adapter: the default sink the CLI wires
//! up, printing each record to stderr as it's reported and the §7 summary
//! line once the run finishes.

use crate::domain::errors::{Diagnostics, Severity};

pub fn emit_to_stderr(diagnostics: &Diagnostics) {
    for record in diagnostics.records() {
        log::log!(severity_to_log_level(record.severity), "{record}");
    }
    eprintln!("{}", diagnostics.summary_line());
}

fn severity_to_log_level(severity: Severity) -> log::Level {
    match severity {
        Severity::Warning => log::Level::Info,
        Severity::Minor => log::Level::Warn,
        Severity::Major | Severity::Fatal => log::Level::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_maps_to_expected_log_levels() {
        assert_eq!(severity_to_log_level(Severity::Warning), log::Level::Info);
        assert_eq!(severity_to_log_level(Severity::Minor), log::Level::Warn);
        assert_eq!(severity_to_log_level(Severity::Fatal), log::Level::Error);
    }
}

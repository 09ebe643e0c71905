//! Command-line surface (§6). Parses arguments with `clap`'s derive macros,
//! then lowers them into a [`RunConfig`] the library-level run function
//! consumes — the CLI crate itself stays a thin adapter, same separation
//! the teacher draws between its `main.rs` wiring and its domain logic.

use crate::config::RunConfig;
use crate::layout::LayoutConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    Native,
    Musicxml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Test,
    Midi,
}

/// Engrave a score from native notation or MusicXML into paginated output
/// and/or a MIDI performance file.
#[derive(Debug, Parser)]
#[command(name = "engrave", version, about)]
pub struct CliArgs {
    /// Input score file (native notation or MusicXML/.mxl).
    pub input: PathBuf,

    /// Input format; inferred from the file extension when omitted.
    #[arg(long, value_enum)]
    pub format: Option<InputFormat>,

    /// Output format for the engraved page stream.
    #[arg(long, value_enum, default_value = "test")]
    pub output: OutputFormat,

    /// Write a Standard MIDI File performance alongside the page output.
    #[arg(long)]
    pub midi_out: Option<PathBuf>,

    /// Dump the computed system/position layout as JSON, for tooling that
    /// wants the spacing result without a rendered page stream.
    #[arg(long)]
    pub layout_json: Option<PathBuf>,

    /// Page width in layout units.
    #[arg(long, default_value_t = 1600.0)]
    pub page_width: f64,

    /// Gap between systems in layout units.
    #[arg(long, default_value_t = 200.0)]
    pub system_gap: f64,

    /// Abort after this many recoverable diagnostics (§7).
    #[arg(long)]
    pub max_errors: Option<usize>,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl CliArgs {
    pub fn resolved_format(&self) -> InputFormat {
        self.format.unwrap_or_else(|| {
            match self.input.extension().and_then(|e| e.to_str()) {
                Some("xml") | Some("musicxml") | Some("mxl") => InputFormat::Musicxml,
                _ => InputFormat::Native,
            }
        })
    }

    pub fn into_run_config(self) -> RunConfig {
        RunConfig {
            layout: LayoutConfig {
                page_width: self.page_width,
                system_gap: self.system_gap,
            },
            max_recoverable_errors: self.max_errors,
            write_midi: self.midi_out.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn infers_musicxml_format_from_extension() {
        let args = CliArgs::parse_from(["engrave", "score.musicxml"]);
        assert_eq!(args.resolved_format(), InputFormat::Musicxml);
    }

    #[test]
    fn infers_native_format_when_extension_is_unrecognised() {
        let args = CliArgs::parse_from(["engrave", "score.ntn"]);
        assert_eq!(args.resolved_format(), InputFormat::Native);
    }

    #[test]
    fn explicit_format_flag_overrides_extension_inference() {
        let args = CliArgs::parse_from(["engrave", "score.xml", "--format", "native"]);
        assert_eq!(args.resolved_format(), InputFormat::Native);
    }
}

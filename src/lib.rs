//! Core engraving engine: bar-item IR (§3), the engraving transforms and
//! readers that build and refine it (§4.1–4.3), the pagination/spacing
//! engine (§4.4–4.6), the embedded drawing interpreter (§4.7), and the
//! output/MIDI backends (§4.8, §6).

pub mod adapters;
pub mod backend;
pub mod config;
pub mod domain;
pub mod draw;
pub mod layout;
pub mod ports;

use adapters::cli::InputFormat;
use backend::OutputSink;
use config::RunConfig;
use domain::errors::{Diagnostics, EngraveError, Severity};
use domain::movement::Movement;
use domain::readers::musicxml::MusicXmlReader;
use domain::readers::native::preprocessor::FsIncludeResolver;
use domain::readers::native::NativeReader;
use std::path::Path;

/// Read `path` according to `format`, returning the parsed movement and the
/// diagnostics accumulated along the way. A fatal diagnostic aborts with
/// `Err` rather than returning a partially built movement.
pub fn read_movement(
    path: &Path,
    format: InputFormat,
    config: &RunConfig,
) -> Result<(Movement, Diagnostics), EngraveError> {
    let mut diagnostics = Diagnostics::new(config.max_recoverable_errors);
    let movement = match format {
        InputFormat::Native => {
            let source = std::fs::read_to_string(path)?;
            let resolver = FsIncludeResolver;
            let reader = NativeReader::new(&resolver);
            reader.read(&source, path, &mut diagnostics)?
        }
        InputFormat::Musicxml => {
            let (movement, warnings) = MusicXmlReader::read_path(path, &mut diagnostics)
                .map_err(|e| EngraveError::Message(e.to_string()))?;
            for warning in warnings {
                log::warn!("{}", warning.message);
            }
            movement
        }
    };
    Ok((movement, diagnostics))
}

/// Run layout over an already-read movement and paint every system through
/// `sink`. Returns the computed layout so the caller (e.g. the MIDI writer)
/// can reuse its timing.
pub fn paint_layout(
    movement: &Movement,
    config: &RunConfig,
    diagnostics: &mut Diagnostics,
    sink: &mut dyn OutputSink,
) -> layout::Layout {
    let computed = layout::compute_layout(movement, &config.layout, diagnostics);

    sink.begin_page(config.layout.page_width, 2000.0);
    for system in &computed.systems {
        sink.comment(&format!("system with {} bars", system.bars.len()));
        for entry in &system.positions {
            sink.move_to(entry.x, 0.0);
        }
    }
    sink.end_page();

    computed
}

/// Abort the run if diagnostics have reached fatal severity, per §7.
pub fn check_fatal(diagnostics: &Diagnostics) -> Result<(), EngraveError> {
    if diagnostics.max_severity().map_or(false, |s| s >= Severity::Fatal) {
        return Err(EngraveError::TooManyErrors {
            count: diagnostics.error_count(),
        });
    }
    Ok(())
}

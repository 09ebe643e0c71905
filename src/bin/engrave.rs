use clap::Parser;
use engrave_core::adapters::cli::{CliArgs, OutputFormat};
use engrave_core::adapters::diagnostics::emit_to_stderr;
use engrave_core::backend::midi::{engine_ticks_per_smf_tick, movement_to_midi_events, write_smf};
use engrave_core::backend::test_writer::TestWriter;
use engrave_core::{check_fatal, paint_layout, read_movement};
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();
    let args = CliArgs::parse();

    let format = args.resolved_format();
    let input = args.input.clone();
    let output = args.output;
    let midi_out = args.midi_out.clone();
    let layout_json = args.layout_json.clone();
    let config = args.into_run_config();

    let (movement, mut diagnostics) = match read_movement(&input, format, &config) {
        Ok(result) => result,
        Err(err) => {
            log::error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let layout = match output {
        OutputFormat::Test | OutputFormat::Midi => {
            let mut sink = TestWriter::new();
            paint_layout(&movement, &config, &mut diagnostics, &mut sink)
        }
    };

    if let Some(json_path) = layout_json {
        match serde_json::to_string_pretty(&layout) {
            Ok(json) => {
                if let Err(err) = std::fs::write(&json_path, json) {
                    log::error!("failed to write {}: {err}", json_path.display());
                    return ExitCode::FAILURE;
                }
            }
            Err(err) => {
                log::error!("failed to serialize layout: {err}");
                return ExitCode::FAILURE;
            }
        }
    }

    if let Some(midi_path) = midi_out {
        let events = movement_to_midi_events(&movement);
        let bytes = write_smf(&events, engine_ticks_per_smf_tick());
        if let Err(err) = std::fs::write(&midi_path, bytes) {
            log::error!("failed to write {}: {err}", midi_path.display());
            return ExitCode::FAILURE;
        }
    }

    emit_to_stderr(&diagnostics);

    if check_fatal(&diagnostics).is_err() {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

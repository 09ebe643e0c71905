//! Exercises the library's top-level orchestration (`read_movement`,
//! `paint_layout`, `check_fatal`) the same way the binary entry point does,
//! without going through the CLI parser.

use engrave_core::adapters::cli::InputFormat;
use engrave_core::backend::midi::{engine_ticks_per_smf_tick, movement_to_midi_events, write_smf};
use engrave_core::backend::test_writer::{Recorded, TestWriter};
use engrave_core::config::RunConfig;
use engrave_core::{check_fatal, paint_layout, read_movement};
use std::io::Write;

#[test]
fn native_source_reads_paints_and_passes_fatal_check() {
    let mut file = tempfile::Builder::new().suffix(".ntn").tempfile().unwrap();
    writeln!(file, "c d e f |\ng a b c' |").unwrap();

    let config = RunConfig::default();
    let (movement, mut diagnostics) =
        read_movement(file.path(), InputFormat::Native, &config).unwrap();
    assert_eq!(movement.stave_count(), 1);

    let mut sink = TestWriter::new();
    let layout = paint_layout(&movement, &config, &mut diagnostics, &mut sink);
    assert!(!layout.systems.is_empty());

    assert!(sink
        .records
        .iter()
        .any(|r| matches!(r, Recorded::BeginPage(..))));
    assert!(check_fatal(&diagnostics).is_ok());
}

#[test]
fn native_source_derives_playable_midi_and_serializable_layout() {
    let mut file = tempfile::Builder::new().suffix(".ntn").tempfile().unwrap();
    writeln!(file, "(ceg) |").unwrap();

    let config = RunConfig::default();
    let (movement, mut diagnostics) =
        read_movement(file.path(), InputFormat::Native, &config).unwrap();

    let mut sink = TestWriter::new();
    let layout = paint_layout(&movement, &config, &mut diagnostics, &mut sink);

    let json = serde_json::to_string(&layout).unwrap();
    assert!(json.contains("systems"));

    let events = movement_to_midi_events(&movement);
    assert!(!events.is_empty());
    let bytes = write_smf(&events, engine_ticks_per_smf_tick());
    assert_eq!(&bytes[0..4], b"MThd");
}

#[test]
fn missing_file_is_reported_as_an_error() {
    let config = RunConfig::default();
    let result = read_movement(
        std::path::Path::new("/nonexistent/path/does-not-exist.ntn"),
        InputFormat::Native,
        &config,
    );
    assert!(result.is_err());
}

//! Pagination must be a pure function of the movement and layout config:
//! running it twice on the same input produces the same system/bar/position
//! shape every time.

use engrave_core::domain::errors::Diagnostics;
use engrave_core::domain::readers::native::preprocessor::FsIncludeResolver;
use engrave_core::domain::readers::native::NativeReader;
use engrave_core::layout::{compute_layout, LayoutConfig};
use std::path::Path;

fn ten_bar_source() -> String {
    let mut source = String::new();
    for _ in 0..10 {
        source.push_str("c4q d4q e4q f4q g4q a4q b4q c5q |\n");
    }
    source
}

#[test]
fn repeated_layout_runs_agree_on_system_shape() {
    let resolver = FsIncludeResolver;
    let reader = NativeReader::new(&resolver);
    let source = ten_bar_source();

    let mut diag_a = Diagnostics::new(None);
    let movement_a = reader.read(&source, Path::new("scale.ntn"), &mut diag_a).unwrap();
    let mut diag_b = Diagnostics::new(None);
    let movement_b = reader.read(&source, Path::new("scale.ntn"), &mut diag_b).unwrap();

    let config = LayoutConfig::default();
    let layout_a = compute_layout(&movement_a, &config, &mut diag_a);
    let layout_b = compute_layout(&movement_b, &config, &mut diag_b);

    assert_eq!(layout_a.systems.len(), layout_b.systems.len());
    for (a, b) in layout_a.systems.iter().zip(layout_b.systems.iter()) {
        assert_eq!(a.bars, b.bars);
        assert_eq!(a.continues_from_previous, b.continues_from_previous);
        let xs_a: Vec<f64> = a.positions.iter().map(|p| p.x).collect();
        let xs_b: Vec<f64> = b.positions.iter().map(|p| p.x).collect();
        assert_eq!(xs_a, xs_b);
    }
}

#[test]
fn every_bar_appears_exactly_once_across_systems() {
    let resolver = FsIncludeResolver;
    let reader = NativeReader::new(&resolver);
    let source = ten_bar_source();
    let mut diagnostics = Diagnostics::new(None);
    let movement = reader.read(&source, Path::new("scale.ntn"), &mut diagnostics).unwrap();

    let config = LayoutConfig::default();
    let layout = compute_layout(&movement, &config, &mut diagnostics);

    let mut seen: Vec<usize> = layout
        .systems
        .iter()
        .flat_map(|s| s.bars.iter().map(|b| b.0))
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..10).collect::<Vec<_>>());
}

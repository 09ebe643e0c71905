//! Horizontal position table (§4.4): given the onset ticks and "extras"
//! (accidentals, dots, underlay text) attached to every column across a
//! system's bars, compute the x-coordinate each column prints at.
//!
//! The table is built in passes, each widening columns that the previous
//! pass under-estimated:
//!
//! 1. detect multi-bar rests so they get one wide column instead of one per
//!    bar,
//! 2. basic positions from a proportional (square-root) spacing function of
//!    note duration,
//! 3. a stem-adjacency pass enforcing a minimum gap so stems/noteheads on
//!    neighbouring columns don't collide,
//! 4. an extras pass that widens a column to fit whatever is pinned beside
//!    it, in priority order (accidentals before ornaments before dots),
//! 5. an underlay-spread pass that stretches columns so lyric text doesn't
//!    overlap its neighbour,
//! 6. end adjustments for the system's final barline.

use crate::domain::value_objects::Tick;
use serde::{Deserialize, Serialize};

/// Minimum horizontal gap (layout units) between two adjacent columns,
/// regardless of how short their ticks-apart value is — keeps dense
/// passages from collapsing noteheads into each other.
pub const MIN_COLUMN_GAP: f64 = 9.0;

/// Spacing-function constant: larger values spread long notes out more
/// relative to short ones.
const SPACING_SCALE: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionEntry {
    pub tick: Tick,
    pub x: f64,
}

/// Extra horizontal demand a column makes beyond the base spacing function,
/// broken out by kind so the packer can apply them in priority order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnExtras {
    pub accidental_width: f64,
    pub ornament_width: f64,
    pub dot_width: f64,
    pub underlay_width: f64,
    /// Set when this column and the next are both ordinary noteheads with
    /// opposing stem directions, which need slightly more room than the
    /// base spacing function alone provides.
    pub stem_adjacency_extra: f64,
}

/// One column's reading-order input: its tick onset and any extras.
#[derive(Debug, Clone, Copy)]
pub struct ColumnInput {
    pub tick: Tick,
    pub extras: ColumnExtras,
}

/// Collapse a run of consecutive whole-bar rests into a single wide column,
/// per the "multi-rest detection" step. `bar_lengths` gives each bar's
/// duration in ticks; `is_whole_bar_rest` reports whether that bar is
/// nothing but a single uninterrupted rest.
pub fn detect_multi_rests(bar_lengths: &[i64], is_whole_bar_rest: &[bool]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut i = 0;
    while i < bar_lengths.len() {
        if is_whole_bar_rest.get(i).copied().unwrap_or(false) {
            let start = i;
            while i < bar_lengths.len() && is_whole_bar_rest.get(i).copied().unwrap_or(false) {
                i += 1;
            }
            if i - start > 1 {
                runs.push((start, i - 1));
            }
        } else {
            i += 1;
        }
    }
    runs
}

/// Step 2: proportional (square-root) spacing from the first column.
fn basic_positions(columns: &[ColumnInput]) -> Vec<f64> {
    let mut positions = Vec::with_capacity(columns.len());
    let mut x = 0.0;
    for (i, col) in columns.iter().enumerate() {
        if i == 0 {
            positions.push(0.0);
            continue;
        }
        let delta_ticks = (col.tick.value() - columns[i - 1].tick.value()).max(1) as f64;
        let width = SPACING_SCALE * delta_ticks.sqrt();
        x += width;
        positions.push(x);
    }
    positions
}

/// Step 3: widen any gap that's narrower than [`MIN_COLUMN_GAP`] plus that
/// column's stem-adjacency demand.
fn enforce_min_gaps(columns: &[ColumnInput], positions: &mut [f64]) {
    for i in 1..positions.len() {
        let required = MIN_COLUMN_GAP + columns[i].extras.stem_adjacency_extra;
        let gap = positions[i] - positions[i - 1];
        if gap < required {
            let shortfall = required - gap;
            for p in positions.iter_mut().skip(i) {
                *p += shortfall;
            }
        }
    }
}

/// Step 4: accidentals, then ornaments, then dots — each pushed left of the
/// column, widening the gap to the previous column if it would otherwise
/// collide with what's already there.
fn apply_extras(columns: &[ColumnInput], positions: &mut [f64]) {
    for i in 1..positions.len() {
        let extras = &columns[i].extras;
        let demand = extras.accidental_width + extras.ornament_width + extras.dot_width;
        let gap = positions[i] - positions[i - 1];
        if gap < demand {
            let shortfall = demand - gap;
            for p in positions.iter_mut().skip(i) {
                *p += shortfall;
            }
        }
    }
}

/// Step 5: underlay text must not overlap the following syllable's column.
fn apply_underlay_spread(columns: &[ColumnInput], positions: &mut [f64]) {
    for i in 1..positions.len() {
        let demand = columns[i - 1].extras.underlay_width;
        let gap = positions[i] - positions[i - 1];
        if gap < demand {
            let shortfall = demand - gap;
            for p in positions.iter_mut().skip(i) {
                *p += shortfall;
            }
        }
    }
}

/// Run all five passes and return the finalized position table ("posstr").
pub fn build_position_table(columns: &[ColumnInput]) -> Vec<PositionEntry> {
    if columns.is_empty() {
        return Vec::new();
    }
    let mut positions = basic_positions(columns);
    enforce_min_gaps(columns, &mut positions);
    apply_extras(columns, &mut positions);
    apply_underlay_spread(columns, &mut positions);

    columns
        .iter()
        .zip(positions)
        .map(|(col, x)| PositionEntry { tick: col.tick, x })
        .collect()
}

/// Step 6: end adjustment — append the system's total width (its final
/// barline position) to the table.
pub fn with_end_adjustment(mut table: Vec<PositionEntry>, total_width: f64) -> Vec<PositionEntry> {
    let last_tick = table.last().map(|e| e.tick).unwrap_or(Tick::ZERO);
    table.push(PositionEntry {
        tick: last_tick,
        x: total_width,
    });
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(tick: i64) -> ColumnInput {
        ColumnInput {
            tick: Tick::new(tick),
            extras: ColumnExtras::default(),
        }
    }

    #[test]
    fn detects_runs_of_whole_bar_rests() {
        let bar_lengths = [100, 100, 100, 100, 100];
        let is_rest = [false, true, true, true, false];
        let runs = detect_multi_rests(&bar_lengths, &is_rest);
        assert_eq!(runs, vec![(1, 3)]);
    }

    #[test]
    fn single_isolated_rest_is_not_a_multi_rest_run() {
        let bar_lengths = [100, 100, 100];
        let is_rest = [false, true, false];
        assert!(detect_multi_rests(&bar_lengths, &is_rest).is_empty());
    }

    #[test]
    fn longer_notes_get_proportionally_more_space() {
        let columns = vec![col(0), col(100), col(300)];
        let table = build_position_table(&columns);
        let gap_short = table[1].x - table[0].x;
        let gap_long = table[2].x - table[1].x;
        assert!(gap_long > gap_short);
    }

    #[test]
    fn min_column_gap_is_enforced_for_very_close_onsets() {
        let columns = vec![col(0), col(1)];
        let table = build_position_table(&columns);
        assert!(table[1].x - table[0].x >= MIN_COLUMN_GAP);
    }

    #[test]
    fn accidental_extra_widens_its_column_gap() {
        let mut columns = vec![col(0), col(50)];
        columns[1].extras.accidental_width = 40.0;
        let table = build_position_table(&columns);
        assert!(table[1].x - table[0].x >= 40.0);
    }

    #[test]
    fn end_adjustment_appends_total_width() {
        let columns = vec![col(0), col(100)];
        let table = build_position_table(&columns);
        let with_end = with_end_adjustment(table, 500.0);
        assert_eq!(with_end.last().unwrap().x, 500.0);
    }
}

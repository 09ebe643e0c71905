//! Pagination and spacing engine (§4.4, §4.5, §4.6): turns a movement's bar
//! sequence into systems of justified, horizontally positioned bars.

pub mod breaker;
pub mod fixed;
pub mod position;
pub mod ties;

use crate::domain::arena::FreeList;
use crate::domain::errors::{Diagnostics, Severity};
use crate::domain::ids::BarIndex;
use crate::domain::item::ItemKind;
use crate::domain::movement::Movement;
use crate::domain::value_objects::Tick;
use breaker::{Breaker, System};
use position::{build_position_table, with_end_adjustment, ColumnExtras, ColumnInput, PositionEntry};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub page_width: f64,
    pub system_gap: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_width: 1600.0,
            system_gap: 200.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaidOutSystem {
    pub bars: Vec<BarIndex>,
    pub positions: Vec<PositionEntry>,
    pub continues_from_previous: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Layout {
    pub systems: Vec<LaidOutSystem>,
}

/// Estimate a bar's natural (unstretched) width from its first stave's item
/// chain: one position column per distinct note/rest onset, plus the
/// barline itself.
fn estimate_bar_width(movement: &Movement, bar: BarIndex) -> f64 {
    let Some(stave) = movement.staves().first() else {
        return 0.0;
    };
    let bar_ref = stave.bar(bar);
    let mut columns = Vec::new();
    let mut t = Tick::ZERO;
    for (_, item) in bar_ref.iter() {
        if let Some(note) = item.kind.as_note() {
            columns.push(ColumnInput {
                tick: t,
                extras: ColumnExtras::default(),
            });
            t = t + note.length;
        }
    }
    if columns.is_empty() {
        return position::MIN_COLUMN_GAP;
    }
    let table = build_position_table(&columns);
    let total_width = table.last().map_or(0.0, |e| e.x) + position::MIN_COLUMN_GAP * 3.0;
    let table = with_end_adjustment(table, total_width);
    table.last().map_or(0.0, |e| e.x)
}

/// Walk every stave's item chain tracking open hairpins in a recycled
/// free-list pool (§5): each `HairpinStart` allocates a slot, each matching
/// `HairpinEnd` frees the most recently opened one, and anything still
/// allocated once a stave's bars run out is an unclosed hairpin.
fn check_hairpins_closed(movement: &Movement, diagnostics: &mut Diagnostics) {
    for stave in movement.staves() {
        let mut pending: FreeList<()> = FreeList::new();
        let mut open_handles = Vec::new();
        for bar in stave.bars() {
            for (_, item) in bar.iter() {
                match &item.kind {
                    ItemKind::HairpinStart(_) => open_handles.push(pending.alloc(())),
                    ItemKind::HairpinEnd(_) => {
                        if let Some(handle) = open_handles.pop() {
                            pending.free(handle);
                        }
                    }
                    _ => {}
                }
            }
        }
        if !pending.is_empty() {
            let _ = diagnostics.report(
                Severity::Minor,
                "HAIRPIN_NOT_CLOSED",
                vec![stave.name.clone(), pending.len().to_string()],
                None,
                None,
            );
        }
    }
}

/// Run the full pagination pipeline for one movement's bar sequence,
/// assuming all staves share the same bar count (checked by the reader).
pub fn compute_layout(movement: &Movement, config: &LayoutConfig, diagnostics: &mut Diagnostics) -> Layout {
    movement.check_bar_counts_consistent(diagnostics);
    check_hairpins_closed(movement, diagnostics);

    let bar_count = movement.staves().first().map_or(0, |s| s.bar_count());
    let mut breaker = Breaker::new(config.page_width);
    for i in 0..bar_count {
        let bar = BarIndex(i);
        let width = estimate_bar_width(movement, bar);
        breaker.push_bar(bar, width, false);
    }
    let systems: Vec<System> = breaker.finish_movement();

    let laid_out = systems
        .into_iter()
        .map(|system| {
            let positions = positions_for_system(movement, &system, config);
            LaidOutSystem {
                bars: system.bars,
                positions,
                continues_from_previous: system.continues_from_previous,
            }
        })
        .collect();

    Layout { systems: laid_out }
}

fn positions_for_system(movement: &Movement, system: &System, config: &LayoutConfig) -> Vec<PositionEntry> {
    let Some(stave) = movement.staves().first() else {
        return Vec::new();
    };
    let mut columns = Vec::new();
    let mut t = Tick::ZERO;
    for &bar in &system.bars {
        for (_, item) in stave.bar(bar).iter() {
            if let Some(note) = item.kind.as_note() {
                columns.push(ColumnInput {
                    tick: t,
                    extras: ColumnExtras::default(),
                });
                t = t + note.length;
            }
        }
    }
    let table = build_position_table(&columns);
    with_end_adjustment(table, config.page_width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bar::Bar;
    use crate::domain::item::{ItemKind, Note, NoteFlags, NoteheadStyle};
    use crate::domain::stave::Stave;
    use crate::domain::value_objects::{AbsPitch, Accidental, Clef, KeySignature, NoteType, StavePitch};

    fn simple_note() -> ItemKind {
        ItemKind::Note(Note {
            note_type: NoteType::Crotchet,
            length: Tick::new(100),
            dots: 0,
            abs_pitch: AbsPitch::new(AbsPitch::MIDDLE_C),
            stave_pitch: StavePitch::new(StavePitch::BOTTOM_LINE),
            accidental: Accidental::None,
            accidental_left_offset: 0,
            flags: NoteFlags::default(),
            accents: Default::default(),
            notehead: NoteheadStyle::Normal,
            masquerade: None,
        })
    }

    fn movement_with_bars(bar_count: usize) -> Movement {
        let mut movement = Movement::new();
        let mut stave = Stave::new("Solo", Clef::Treble, KeySignature::C_MAJOR);
        for _ in 0..bar_count {
            let mut bar = Bar::new();
            bar.push_back(simple_note());
            bar.push_back(simple_note());
            stave.push_bar(bar);
        }
        movement.add_stave(stave);
        movement
    }

    #[test]
    fn compute_layout_produces_at_least_one_system() {
        let movement = movement_with_bars(3);
        let config = LayoutConfig::default();
        let mut diagnostics = Diagnostics::new(None);
        let layout = compute_layout(&movement, &config, &mut diagnostics);
        assert!(!layout.systems.is_empty());
        let total_bars: usize = layout.systems.iter().map(|s| s.bars.len()).sum();
        assert_eq!(total_bars, 3);
    }

    #[test]
    fn unclosed_hairpin_is_reported() {
        let mut movement = Movement::new();
        let mut stave = Stave::new("Solo", Clef::Treble, KeySignature::C_MAJOR);
        let mut bar = Bar::new();
        bar.push_back(ItemKind::HairpinStart(crate::domain::item::HairpinStart {
            kind: crate::domain::item::HairpinKind::Crescendo,
            below: false,
            open_width: 0,
        }));
        bar.push_back(simple_note());
        stave.push_bar(bar);
        movement.add_stave(stave);

        let mut diagnostics = Diagnostics::new(None);
        check_hairpins_closed(&movement, &mut diagnostics);
        assert_eq!(diagnostics.error_count(), 1);
    }

    #[test]
    fn closed_hairpin_reports_nothing() {
        let mut movement = Movement::new();
        let mut stave = Stave::new("Solo", Clef::Treble, KeySignature::C_MAJOR);
        let mut bar = Bar::new();
        bar.push_back(ItemKind::HairpinStart(crate::domain::item::HairpinStart {
            kind: crate::domain::item::HairpinKind::Crescendo,
            below: false,
            open_width: 0,
        }));
        bar.push_back(simple_note());
        bar.push_back(ItemKind::HairpinEnd(crate::domain::item::HairpinEnd { end_mark: false }));
        stave.push_bar(bar);
        movement.add_stave(stave);

        let mut diagnostics = Diagnostics::new(None);
        check_hairpins_closed(&movement, &mut diagnostics);
        assert_eq!(diagnostics.error_count(), 0);
    }

    #[test]
    fn compute_layout_is_deterministic_across_runs() {
        let movement = movement_with_bars(5);
        let config = LayoutConfig::default();
        let mut diagnostics_a = Diagnostics::new(None);
        let mut diagnostics_b = Diagnostics::new(None);
        let layout_a = compute_layout(&movement, &config, &mut diagnostics_a);
        let layout_b = compute_layout(&movement, &config, &mut diagnostics_b);
        assert_eq!(layout_a.systems.len(), layout_b.systems.len());
        for (a, b) in layout_a.systems.iter().zip(layout_b.systems.iter()) {
            assert_eq!(a.positions.len(), b.positions.len());
        }
    }
}

//! Build a single treble stave carrying a C major scale directly through the
//! bar-item IR, bypassing both readers, and run it through layout.

use engrave_core::domain::item::{ItemKind, Note, NoteheadStyle};
use engrave_core::domain::movement::Movement;
use engrave_core::domain::stave::Stave;
use engrave_core::domain::value_objects::{
    AbsPitch, Accidental, Clef, KeySignature, NoteType, StavePitch, Tick,
};
use engrave_core::domain::{Bar, Diagnostics};
use engrave_core::layout::{compute_layout, LayoutConfig};

fn scale_note(step_from_middle_c: i32) -> ItemKind {
    ItemKind::Note(Note {
        note_type: NoteType::Crotchet,
        length: Tick::new(NoteType::Crotchet.base_ticks()),
        dots: 0,
        abs_pitch: AbsPitch::new(AbsPitch::MIDDLE_C + step_from_middle_c),
        stave_pitch: StavePitch::new(StavePitch::BOTTOM_LINE + step_from_middle_c * 2),
        accidental: Accidental::None,
        accidental_left_offset: 0,
        flags: Default::default(),
        accents: Default::default(),
        notehead: NoteheadStyle::Normal,
        masquerade: None,
    })
}

fn main() {
    let mut movement = Movement::new();
    let mut stave = Stave::new("Piano", Clef::Treble, KeySignature::C_MAJOR);

    // C4 through C5, one note per scale degree, in whole-tone semitone steps.
    let steps = [0, 2, 4, 5, 7, 9, 11, 12];
    let mut bar = Bar::new();
    for step in steps {
        bar.push_back(scale_note(step));
    }
    bar.push_back(ItemKind::Barline(engrave_core::domain::item::Barline {
        kind: engrave_core::domain::item::BarlineType::Normal,
        style: 0,
    }));
    stave.push_bar(bar);
    movement.add_stave(stave);
    movement.assign_bar_numbers(1, 1, None);

    let mut diagnostics = Diagnostics::new(None);
    let layout = compute_layout(&movement, &LayoutConfig::default(), &mut diagnostics);

    println!("systems: {}", layout.systems.len());
    for system in &layout.systems {
        println!("  bars in system: {}", system.bars.len());
    }
    println!("{}", diagnostics.summary_line());
}

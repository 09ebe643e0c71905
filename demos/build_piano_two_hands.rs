//! Build a two-stave piano part (treble and bass) directly through the
//! bar-item IR and render it to a Standard MIDI File.

use engrave_core::backend::midi::{engine_ticks_per_smf_tick, movement_to_midi_events, write_smf};
use engrave_core::domain::item::{Barline, BarlineType, ItemKind, Note, NoteheadStyle};
use engrave_core::domain::movement::Movement;
use engrave_core::domain::stave::Stave;
use engrave_core::domain::value_objects::{
    AbsPitch, Accidental, Clef, KeySignature, NoteType, StavePitch, Tick,
};
use engrave_core::domain::Bar;

fn chord_note(abs_pitch: i32, stave_pitch: i32) -> ItemKind {
    ItemKind::Note(Note {
        note_type: NoteType::Semibreve,
        length: Tick::new(NoteType::Semibreve.base_ticks()),
        dots: 0,
        abs_pitch: AbsPitch::new(abs_pitch),
        stave_pitch: StavePitch::new(stave_pitch),
        accidental: Accidental::None,
        accidental_left_offset: 0,
        flags: Default::default(),
        accents: Default::default(),
        notehead: NoteheadStyle::Normal,
        masquerade: None,
    })
}

fn chord_continuation(abs_pitch: i32, stave_pitch: i32) -> ItemKind {
    match chord_note(abs_pitch, stave_pitch) {
        ItemKind::Note(note) => ItemKind::ChordContinuation(note),
        _ => unreachable!(),
    }
}

fn barline() -> ItemKind {
    ItemKind::Barline(Barline {
        kind: BarlineType::Normal,
        style: 0,
    })
}

fn main() {
    let mut movement = Movement::new();

    // Right hand: high C major triad (C5, E5, G5).
    let mut treble = Stave::new("Piano (RH)", Clef::Treble, KeySignature::C_MAJOR);
    let mut treble_bar = Bar::new();
    treble_bar.push_back(chord_note(AbsPitch::MIDDLE_C + 12, StavePitch::BOTTOM_LINE + 24));
    treble_bar.push_back(chord_continuation(AbsPitch::MIDDLE_C + 16, StavePitch::BOTTOM_LINE + 28));
    treble_bar.push_back(chord_continuation(AbsPitch::MIDDLE_C + 19, StavePitch::BOTTOM_LINE + 32));
    treble_bar.push_back(barline());
    treble.push_bar(treble_bar);

    // Left hand: low C major triad (C3, E3, G3).
    let mut bass = Stave::new("Piano (LH)", Clef::Bass, KeySignature::C_MAJOR);
    let mut bass_bar = Bar::new();
    bass_bar.push_back(chord_note(AbsPitch::MIDDLE_C - 24, StavePitch::BOTTOM_LINE - 48));
    bass_bar.push_back(chord_continuation(AbsPitch::MIDDLE_C - 20, StavePitch::BOTTOM_LINE - 44));
    bass_bar.push_back(chord_continuation(AbsPitch::MIDDLE_C - 17, StavePitch::BOTTOM_LINE - 40));
    bass_bar.push_back(barline());
    bass.push_bar(bass_bar);

    movement.add_stave(treble);
    movement.add_stave(bass);
    movement.assign_bar_numbers(1, 1, None);

    let events = movement_to_midi_events(&movement);
    let smf = write_smf(&events, engine_ticks_per_smf_tick());

    println!("staves: {}", movement.stave_count());
    println!("note-on/off events: {}", events.len());
    println!("SMF bytes: {}", smf.len());
}

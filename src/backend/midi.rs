//! MIDI Type-0 standard MIDI file writer (§6). Emits a single `MThd` header
//! chunk and one `MTrk` chunk containing every stave's events merged onto
//! one timeline, using running status to avoid repeating a status byte for
//! consecutive events of the same kind and variable-length quantities for
//! delta times, per the SMF format.

use crate::domain::item::{ItemKind, Note};
use crate::domain::movement::Movement;
use crate::domain::value_objects::{AbsPitch, NoteType, Tick};

/// Ticks-per-quarter-note declared in the file header: 24 ticks per
/// crotchet, matching the fixed division PMW's own MIDI writer emits.
pub const TICKS_PER_QUARTER: u16 = 24;

/// Factor to pass as `write_smf`'s `ticks_per_engine_tick` so that engine
/// ticks (fractions of a breve) land on [`TICKS_PER_QUARTER`] MIDI ticks per
/// crotchet.
pub fn engine_ticks_per_smf_tick() -> f64 {
    TICKS_PER_QUARTER as f64 / NoteType::Crotchet.base_ticks() as f64
}

/// Default velocity for notes with no explicit dynamic markings applied.
const DEFAULT_VELOCITY: u8 = 80;

fn midi_pitch(abs_pitch: AbsPitch) -> u8 {
    let semitones_from_middle_c = (abs_pitch.value() - AbsPitch::MIDDLE_C) / 2;
    (60 + semitones_from_middle_c).clamp(0, 127) as u8
}

fn push_note_events(events: &mut Vec<MidiEvent>, channel: u8, onset: Tick, note: &Note) {
    if note.flags.no_play || note.flags.hidden {
        return;
    }
    let pitch = midi_pitch(note.abs_pitch);
    events.push(MidiEvent {
        at: onset,
        kind: MidiEventKind::NoteOn {
            channel,
            pitch,
            velocity: DEFAULT_VELOCITY,
        },
    });
    events.push(MidiEvent {
        at: onset + note.length,
        kind: MidiEventKind::NoteOff { channel, pitch },
    });
}

/// Walk every stave's item chain in playback order and derive the `NoteOn`/
/// `NoteOff` events `write_smf` needs. Each stave plays on its own channel
/// (wrapping past 16 staves, since a channel nibble only holds 16 values);
/// chord continuations share their chord's onset instead of advancing the
/// timeline again.
pub fn movement_to_midi_events(movement: &Movement) -> Vec<MidiEvent> {
    let mut events = Vec::new();
    for (stave_index, stave) in movement.staves().iter().enumerate() {
        let channel = (stave_index % 16) as u8;
        let mut cursor = Tick::ZERO;
        let mut chord_onset = Tick::ZERO;
        for bar in stave.bars() {
            for (_, item) in bar.iter() {
                match &item.kind {
                    ItemKind::Note(note) => {
                        chord_onset = cursor;
                        push_note_events(&mut events, channel, chord_onset, note);
                        cursor = cursor + note.length;
                    }
                    ItemKind::ChordContinuation(note) => {
                        push_note_events(&mut events, channel, chord_onset, note);
                    }
                    _ => {}
                }
            }
        }
    }
    events
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiEvent {
    pub at: Tick,
    pub kind: MidiEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEventKind {
    NoteOn { channel: u8, pitch: u8, velocity: u8 },
    NoteOff { channel: u8, pitch: u8 },
    ProgramChange { channel: u8, program: u8 },
    TempoChange { microseconds_per_quarter: u32 },
}

/// Scrub factor applied to a tremolo's written note length to derive the
/// length of each individual repeated note: a two-beam tremolo plays twice
/// as fast as written, three-beam three times, and so on.
pub fn tremolo_scrub_factor(beam_count: u8) -> u32 {
    match beam_count {
        1 => 2,
        2 => 4,
        3 => 6,
        _ => 3,
    }
}

/// Merge a tie chain's written lengths into one sounding duration: the
/// first note's `note-on` plays through every tied note's length, with a
/// single `note-off` at the end.
pub fn merge_tied_lengths(lengths: &[i64]) -> i64 {
    lengths.iter().sum()
}

/// Expand a `[midi_repeats]`-style repeat count into concrete start ticks
/// for each playback, given one bar-cycle's length in ticks.
pub fn expand_repeats(cycle_length: i64, repeat_count: u16, base_start: i64) -> Vec<i64> {
    (0..repeat_count.max(1))
        .map(|i| base_start + cycle_length * i as i64)
        .collect()
}

fn write_vlq(out: &mut Vec<u8>, mut value: u32) {
    let mut bytes = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        bytes.push(((value & 0x7F) as u8) | 0x80);
        value >>= 7;
    }
    bytes.reverse();
    out.extend(bytes);
}

/// Render a list of absolute-tick events (already merged across staves and
/// sorted by `at`) into a Type-0 Standard MIDI File byte stream.
pub fn write_smf(events: &[MidiEvent], ticks_per_engine_tick: f64) -> Vec<u8> {
    let mut track = Vec::new();
    let mut last_tick_written = 0i64;
    let mut running_status: Option<u8> = None;

    let mut sorted = events.to_vec();
    sorted.sort_by_key(|e| e.at);

    for event in &sorted {
        let smf_tick = (event.at.value() as f64 * ticks_per_engine_tick).round() as i64;
        let delta = (smf_tick - last_tick_written).max(0) as u32;
        last_tick_written = smf_tick;
        write_vlq(&mut track, delta);

        match event.kind {
            MidiEventKind::NoteOn { channel, pitch, velocity } => {
                let status = 0x90 | (channel & 0x0F);
                if running_status != Some(status) {
                    track.push(status);
                    running_status = Some(status);
                }
                track.push(pitch);
                track.push(velocity);
            }
            MidiEventKind::NoteOff { channel, pitch } => {
                let status = 0x80 | (channel & 0x0F);
                if running_status != Some(status) {
                    track.push(status);
                    running_status = Some(status);
                }
                track.push(pitch);
                track.push(0);
            }
            MidiEventKind::ProgramChange { channel, program } => {
                let status = 0xC0 | (channel & 0x0F);
                track.push(status);
                running_status = None;
                track.push(program);
            }
            MidiEventKind::TempoChange { microseconds_per_quarter } => {
                track.push(0xFF);
                track.push(0x51);
                track.push(0x03);
                let bytes = microseconds_per_quarter.to_be_bytes();
                track.extend_from_slice(&bytes[1..4]);
                running_status = None;
            }
        }
    }

    // End-of-track meta event.
    write_vlq(&mut track, 0);
    track.extend_from_slice(&[0xFF, 0x2F, 0x00]);

    let mut file = Vec::new();
    file.extend_from_slice(b"MThd");
    file.extend_from_slice(&6u32.to_be_bytes());
    file.extend_from_slice(&0u16.to_be_bytes()); // format 0
    file.extend_from_slice(&1u16.to_be_bytes()); // one track
    file.extend_from_slice(&TICKS_PER_QUARTER.to_be_bytes());

    file.extend_from_slice(b"MTrk");
    file.extend_from_slice(&(track.len() as u32).to_be_bytes());
    file.extend_from_slice(&track);

    file
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tremolo_scrub_factors_match_beam_count() {
        assert_eq!(tremolo_scrub_factor(1), 2);
        assert_eq!(tremolo_scrub_factor(2), 4);
        assert_eq!(tremolo_scrub_factor(3), 6);
    }

    #[test]
    fn merge_tied_lengths_sums_the_chain() {
        assert_eq!(merge_tied_lengths(&[100, 50, 25]), 175);
    }

    #[test]
    fn expand_repeats_produces_one_start_per_playback() {
        let starts = expand_repeats(960, 3, 0);
        assert_eq!(starts, vec![0, 960, 1920]);
    }

    #[test]
    fn movement_to_midi_events_pairs_chord_members_on_one_onset() {
        use crate::domain::item::{Barline, BarlineType, NoteheadStyle};
        use crate::domain::stave::Stave;
        use crate::domain::value_objects::{Accidental, Clef, KeySignature, StavePitch};
        use crate::domain::Bar;

        fn note(abs: i32, stave: i32) -> crate::domain::item::Note {
            Note {
                note_type: NoteType::Crotchet,
                length: Tick::new(NoteType::Crotchet.base_ticks()),
                dots: 0,
                abs_pitch: AbsPitch::new(abs),
                stave_pitch: StavePitch::new(stave),
                accidental: Accidental::None,
                accidental_left_offset: 0,
                flags: Default::default(),
                accents: Default::default(),
                notehead: NoteheadStyle::Normal,
                masquerade: None,
            }
        }

        let mut movement = Movement::new();
        let mut stave = Stave::new("Piano", Clef::Treble, KeySignature::C_MAJOR);
        let mut bar = Bar::new();
        bar.push_back(ItemKind::Note(note(AbsPitch::MIDDLE_C, StavePitch::BOTTOM_LINE)));
        bar.push_back(ItemKind::ChordContinuation(note(
            AbsPitch::MIDDLE_C + 8,
            StavePitch::BOTTOM_LINE + 4,
        )));
        bar.push_back(ItemKind::Barline(Barline {
            kind: BarlineType::Normal,
            style: 0,
        }));
        stave.push_bar(bar);
        movement.add_stave(stave);

        let events = movement_to_midi_events(&movement);
        let onsets: Vec<Tick> = events
            .iter()
            .filter(|e| matches!(e.kind, MidiEventKind::NoteOn { .. }))
            .map(|e| e.at)
            .collect();
        assert_eq!(onsets, vec![Tick::ZERO, Tick::ZERO]);
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn write_smf_produces_valid_header_chunks() {
        let events = vec![
            MidiEvent {
                at: Tick::new(0),
                kind: MidiEventKind::NoteOn {
                    channel: 0,
                    pitch: 60,
                    velocity: 100,
                },
            },
            MidiEvent {
                at: Tick::new(480),
                kind: MidiEventKind::NoteOff { channel: 0, pitch: 60 },
            },
        ];
        let bytes = write_smf(&events, 1.0);
        assert_eq!(&bytes[0..4], b"MThd");
        let mtrk_pos = bytes.windows(4).position(|w| w == b"MTrk").unwrap();
        assert!(mtrk_pos > 0);
        assert_eq!(&bytes[bytes.len() - 3..], &[0xFF, 0x2F, 0x00]);
    }
}

//! Semantic conversion from parsed MusicXML data into the engine's own bar-
//! item IR (§4.2): duration-unit rescaling, `<chord/>` → chord-continuation
//! tagging, `fifths` → key-signature mapping, and `<backup>`/`<forward>`
//! time-pointer handling.

use super::errors::{ImportWarning, WarningCategory};
use super::types::{AttributesData, BackupForward, MeasureData, NoteData, PartData, ScorePartwiseData};
use crate::domain::bar::Bar;
use crate::domain::errors::Diagnostics;
use crate::domain::item::{
    Barline, BarlineType, ItemKind, Note, NoteFlags, NoteheadStyle, SignatureChange, TimeSignature, Tie, TieFlags,
};
use crate::domain::movement::Movement;
use crate::domain::stave::Stave;
use crate::domain::value_objects::{AbsPitch, Accidental, Clef, KeySignature, NoteType, StavePitch, Tick};

fn step_semitone(step: char) -> i32 {
    match step.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => 0,
    }
}

fn step_stave_index(step: char) -> i32 {
    match step.to_ascii_uppercase() {
        'C' => 0,
        'D' => 1,
        'E' => 2,
        'F' => 3,
        'G' => 4,
        'A' => 5,
        'B' => 6,
        _ => 0,
    }
}

fn note_type_from_xml(value: Option<&str>, fallback_ticks: i64) -> NoteType {
    match value {
        Some("breve") => NoteType::Breve,
        Some("whole") => NoteType::Semibreve,
        Some("half") => NoteType::Minim,
        Some("quarter") => NoteType::Crotchet,
        Some("eighth") => NoteType::Quaver,
        Some("16th") => NoteType::Semiquaver,
        Some("32nd") => NoteType::Demisemiquaver,
        Some("64th") => NoteType::Hemidemisemiquaver,
        _ => nearest_note_type(fallback_ticks),
    }
}

fn nearest_note_type(ticks: i64) -> NoteType {
    use NoteType::*;
    let candidates = [
        Breve,
        Semibreve,
        Minim,
        Crotchet,
        Quaver,
        Semiquaver,
        Demisemiquaver,
        Hemidemisemiquaver,
    ];
    candidates
        .into_iter()
        .min_by_key(|t| (t.base_ticks() - ticks).abs())
        .unwrap_or(Crotchet)
}

fn clef_from_sign(sign: &str, line: Option<i32>, octave_change: Option<i32>) -> Clef {
    match (sign, octave_change.unwrap_or(0)) {
        ("G", 0) => Clef::Treble,
        ("G", -1) => Clef::TrebleOctaveDown,
        ("G", 1) => Clef::TrebleOctaveUp,
        ("F", -1) => Clef::BassOctaveDown,
        ("F", _) => Clef::Bass,
        ("C", _) if line == Some(3) => Clef::Alto,
        ("C", _) => Clef::Tenor,
        _ => Clef::Treble,
    }
}

fn key_signature_from_fifths(fifths: i32) -> KeySignature {
    KeySignature::standard(fifths.clamp(-7, 7) as i8).unwrap_or(KeySignature::C_MAJOR)
}

/// How many engine ticks one MusicXML `<duration>` unit represents, given
/// the measure's `<divisions>` (divisions-per-quarter-note).
fn ticks_per_division(divisions: i64) -> i64 {
    if divisions <= 0 {
        NoteType::Crotchet.base_ticks()
    } else {
        NoteType::Crotchet.base_ticks() / divisions
    }
}

fn convert_note(note: &NoteData, ticks_per_div: i64) -> ItemKind {
    let length = Tick::new(note.duration * ticks_per_div);
    let note_type = note_type_from_xml(note.note_type.as_deref(), length.value());

    if note.is_rest || note.pitch.is_none() {
        let ir_note = Note {
            note_type,
            length,
            dots: note.dots,
            abs_pitch: AbsPitch::new(AbsPitch::MIDDLE_C),
            stave_pitch: StavePitch::new(StavePitch::BOTTOM_LINE + 8),
            accidental: Accidental::None,
            accidental_left_offset: 0,
            flags: NoteFlags {
                centre_rest: true,
                hidden: note.is_rest && note.pitch.is_none() && note.duration == 0,
                ..Default::default()
            },
            accents: Default::default(),
            notehead: if note.is_rest { NoteheadStyle::NoNotehead } else { NoteheadStyle::Normal },
            masquerade: None,
        };
        return ItemKind::Note(ir_note);
    }

    let pitch = note.pitch.as_ref().unwrap();
    let abs_pitch = AbsPitch::new(AbsPitch::MIDDLE_C + (pitch.octave - 4) * 12 + step_semitone(pitch.step) + pitch.alter);
    let stave_pitch = StavePitch::new(StavePitch::BOTTOM_LINE + (pitch.octave - 4) * 28 + step_stave_index(pitch.step) * 4);
    let accidental = match pitch.alter {
        2 => Accidental::DoubleSharp,
        1 => Accidental::Sharp,
        -1 => Accidental::Flat,
        -2 => Accidental::DoubleFlat,
        _ => Accidental::None,
    };

    let ir_note = Note {
        note_type,
        length,
        dots: note.dots,
        abs_pitch,
        stave_pitch,
        accidental,
        accidental_left_offset: 0,
        flags: NoteFlags {
            tied_from: note.tie_stop,
            ..Default::default()
        },
        accents: Default::default(),
        notehead: NoteheadStyle::Normal,
        masquerade: None,
    };

    if note.chord {
        ItemKind::ChordContinuation(ir_note)
    } else {
        ItemKind::Note(ir_note)
    }
}

fn convert_measure(measure: &MeasureData, divisions_in_effect: &mut i64, stave: &mut Stave) {
    let mut bar = Bar::new();

    if let Some(AttributesData {
        divisions,
        fifths,
        beats,
        beat_type,
        clef_sign,
        clef_line,
        clef_octave_change,
        ..
    }) = measure.attributes.as_ref()
    {
        if let Some(d) = divisions {
            *divisions_in_effect = *d;
        }
        if let Some(fifths) = fifths {
            bar.push_back(ItemKind::KeyChange(SignatureChange {
                value: key_signature_from_fifths(*fifths),
                suppress: false,
                assume: false,
            }));
        }
        if let (Some(beats), Some(beat_type)) = (beats, beat_type) {
            bar.push_back(ItemKind::TimeChange(SignatureChange {
                value: TimeSignature {
                    beats: *beats,
                    beat_type: *beat_type,
                },
                suppress: false,
                assume: false,
            }));
        }
        if let Some(sign) = clef_sign {
            bar.push_back(ItemKind::ClefChange(SignatureChange {
                value: clef_from_sign(sign, *clef_line, *clef_octave_change),
                suppress: false,
                assume: false,
            }));
        }
    }

    let ticks_per_div = ticks_per_division(*divisions_in_effect);
    let mut tie_open: Option<crate::domain::ids::ItemIndex> = None;
    let mut backups = measure.backups.iter().peekable();

    for (i, note) in measure.notes.iter().enumerate() {
        while let Some(&event) = backups.peek() {
            let at = match event {
                BackupForward::Backup { after_note_index, .. } => *after_note_index,
                BackupForward::Forward { after_note_index, .. } => *after_note_index,
            };
            if at != i {
                break;
            }
            backups.next();
            // Backup/forward reposition the voice's timeline; the engine
            // represents both as a reset-to-offset marker since bar items
            // are stored in reading order rather than by absolute time.
            bar.push_back(ItemKind::ResetToOffsetZero);
        }

        let kind = convert_note(note, ticks_per_div);
        let idx = bar.push_back(kind);

        if note.tie_start {
            tie_open = Some(idx);
        }
        if note.tie_stop {
            if let Some(from) = tie_open.take() {
                bar.push_back(ItemKind::Tie(Tie {
                    above_count: 0,
                    below_count: 0,
                    flags: TieFlags::default(),
                    preceding_note: Some(from),
                }));
            }
        }
    }

    bar.push_back(ItemKind::Barline(Barline {
        kind: BarlineType::Normal,
        style: 0,
    }));
    stave.push_bar(bar);
}

/// Convert one already-parsed [`ScorePartwiseData`] document into a
/// [`Movement`], reporting non-fatal issues to `diagnostics` and returning
/// the part-level warnings collected along the way.
pub fn convert(score: &ScorePartwiseData, diagnostics: &mut Diagnostics) -> (Movement, Vec<ImportWarning>) {
    let mut movement = Movement::new();
    let mut warnings = Vec::new();

    for part in &score.parts {
        warnings.extend(convert_part(part, &mut movement));
    }

    movement.check_bar_counts_consistent(diagnostics);
    if let Some(first) = movement.staves().first() {
        movement.assign_bar_numbers(first.bar_count(), 1, None);
    }

    (movement, warnings)
}

fn convert_part(part: &PartData, movement: &mut Movement) -> Vec<ImportWarning> {
    let mut warnings = Vec::new();
    let mut stave = Stave::new(part.id.clone(), Clef::Treble, KeySignature::C_MAJOR);
    let mut divisions_in_effect = 1;

    for measure in &part.measures {
        if measure.attributes.as_ref().map_or(true, |a| a.divisions.is_none()) && divisions_in_effect == 1 {
            warnings.push(
                ImportWarning::new(
                    WarningCategory::MissingDivisions,
                    "no <divisions> seen yet; assuming 1 division per quarter note",
                )
                .with_part(part.id.clone())
                .with_measure(measure.number.clone()),
            );
        }
        convert_measure(measure, &mut divisions_in_effect, &mut stave);
    }

    movement.add_stave(stave);
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::readers::musicxml::parser::parse_score_partwise;

    #[test]
    fn converts_simple_part_into_one_stave_with_matching_bar_count() {
        let xml = r#"<score-partwise>
          <part id="P1">
            <measure number="1">
              <attributes><divisions>2</divisions><fifths>0</fifths></attributes>
              <note><pitch><step>C</step><octave>4</octave></pitch><duration>2</duration><type>quarter</type></note>
            </measure>
          </part>
        </score-partwise>"#;
        let score = parse_score_partwise(xml).unwrap();
        let mut diagnostics = Diagnostics::new(None);
        let (movement, _warnings) = convert(&score, &mut diagnostics);
        assert_eq!(movement.stave_count(), 1);
        assert_eq!(movement.stave(0).bar_count(), 1);
    }

    #[test]
    fn chord_flag_produces_chord_continuation_item() {
        let xml = r#"<score-partwise>
          <part id="P1">
            <measure number="1">
              <attributes><divisions>1</divisions></attributes>
              <note><pitch><step>C</step><octave>4</octave></pitch><duration>4</duration></note>
              <note><chord/><pitch><step>E</step><octave>4</octave></pitch><duration>4</duration></note>
            </measure>
          </part>
        </score-partwise>"#;
        let score = parse_score_partwise(xml).unwrap();
        let mut diagnostics = Diagnostics::new(None);
        let (movement, _warnings) = convert(&score, &mut diagnostics);
        let bar = movement.stave(0).bar(crate::domain::ids::BarIndex(0));
        let kinds: Vec<bool> = bar
            .iter()
            .map(|(_, item)| matches!(item.kind, ItemKind::ChordContinuation(_)))
            .collect();
        assert_eq!(kinds, vec![false, true, false]); // note, chord-continuation, barline
    }
}

//! Native-notation parser: turns the lexer's token stream into bar-item IR
//! (§4.2). Implements the note-reading algorithm (letter, accidental,
//! octave marks, duration modifiers, dots), rests, ties, beam breaks,
//! parenthesised chords, duplication (`p` repeats the previous note; `x3`
//! repeats it three times), repeat barlines (`|:` / `:|`), the `key`
//! directive, and tuplet brackets written `{pletlen ... }` or
//! `{pletlen/pletnum ...}` / `{pletlen/pletnum/newpletlen ...}`.
//!
//! Pitch letter case sets only the *default* note-type (uppercase = minim,
//! lowercase = crotchet); it never affects pitch. `=` shortens a note by two
//! steps on the breve..128th scale, `-` by one step, `+` lengthens by one
//! step, and any of them may repeat. `'`/`` ` `` shift the octave register
//! up/down. When a note carries no explicit octave mark, its register is
//! whichever of {previous register - 1, same, + 1} lands its (unaltered)
//! pitch closest to the previous note's — there is no absolute default
//! octave, only "nearest to what came before".

use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

use once_cell::sync::Lazy;

use super::lexer::{Lexer, Token};
use crate::domain::errors::EngraveError;
use crate::domain::item::{
    Barline, BarlineType, BeamBreak, ItemKind, Note, NoteFlags, NoteheadStyle, SignatureChange,
    Tie, TieFlags, TupletEnd, TupletStart,
};
use crate::domain::value_objects::{AbsPitch, Accidental, KeySignature, NoteType, StavePitch, Tick};

const OCTAVE_QUARTERTONES: i32 = 24;
const OCTAVE_STAVE_UNITS: i32 = 28;

fn letter_pitch_offset(letter: char) -> Option<i32> {
    match letter {
        'c' => Some(0),
        'd' => Some(4),
        'e' => Some(8),
        'f' => Some(10),
        'g' => Some(14),
        'a' => Some(18),
        'b' => Some(22),
        _ => None,
    }
}

fn letter_stave_offset(letter: char) -> Option<i32> {
    match letter {
        'c' => Some(0),
        'd' => Some(1),
        'e' => Some(2),
        'f' => Some(3),
        'g' => Some(4),
        'a' => Some(5),
        'b' => Some(6),
        _ => None,
    }
}

/// Standard key names to a sharps(+)/flats(-) count, circle-of-fifths order.
static KEY_NAMES: Lazy<HashMap<&'static str, i8>> = Lazy::new(|| {
    HashMap::from([
        ("C", 0),
        ("G", 1),
        ("D", 2),
        ("A", 3),
        ("E", 4),
        ("B", 5),
        ("F#", 6),
        ("C#", 7),
        ("F", -1),
        ("Bb", -2),
        ("Eb", -3),
        ("Ab", -4),
        ("Db", -5),
        ("Gb", -6),
        ("Cb", -7),
    ])
});

const SHARP_ORDER: [char; 7] = ['f', 'c', 'g', 'd', 'a', 'e', 'b'];
const FLAT_ORDER: [char; 7] = ['b', 'e', 'a', 'd', 'g', 'c', 'f'];

/// Rebuild the per-bar accidental table from a key signature's standard
/// sharps/flats count. Tracks by letter name only (not per octave, unlike
/// the original's full pitch-indexed table) — this engine has no scenario
/// that needs an accidental on one octave of a letter to leave another
/// octave of the same letter untouched within a bar.
fn bar_accidentals(key: KeySignature) -> HashMap<char, Accidental> {
    let mut table: HashMap<char, Accidental> =
        "cdefgab".chars().map(|c| (c, Accidental::None)).collect();
    if let KeySignature::Standard(sharps) = key {
        if sharps > 0 {
            for &letter in SHARP_ORDER.iter().take(sharps as usize) {
                table.insert(letter, Accidental::Sharp);
            }
        } else if sharps < 0 {
            for &letter in FLAT_ORDER.iter().take((-sharps) as usize) {
                table.insert(letter, Accidental::Flat);
            }
        }
    }
    table
}

fn read_accidental(chars: &mut Peekable<Chars>) -> Option<Accidental> {
    match chars.peek() {
        Some('#') => {
            chars.next();
            if chars.peek() == Some(&'#') {
                chars.next();
                Some(Accidental::DoubleSharp)
            } else if chars.peek() == Some(&'-') {
                chars.next(); // half-sharp, approximated as a full sharp
                Some(Accidental::Sharp)
            } else {
                Some(Accidental::Sharp)
            }
        }
        Some('$') => {
            chars.next();
            if chars.peek() == Some(&'-') {
                chars.next(); // half-flat, approximated as a full flat
                Some(Accidental::Flat)
            } else {
                Some(Accidental::Flat)
            }
        }
        Some('%') => {
            chars.next();
            Some(Accidental::Natural)
        }
        _ => None,
    }
}

/// `=` shortens two steps, `-` one step, `+` lengthens one step (any may
/// repeat); `'`/`` ` `` shift the octave register up/down.
fn read_modifiers(chars: &mut Peekable<Chars>) -> (i32, i32) {
    let mut type_shift = 0;
    let mut octave_marks = 0;
    loop {
        match chars.peek() {
            Some('=') => {
                type_shift += 2;
                chars.next();
            }
            Some('-') => {
                type_shift += 1;
                chars.next();
            }
            Some('+') => {
                type_shift -= 1;
                chars.next();
            }
            Some('\'') => {
                octave_marks += 1;
                chars.next();
            }
            Some('`') => {
                octave_marks -= 1;
                chars.next();
            }
            _ => break,
        }
    }
    (type_shift, octave_marks)
}

fn read_dots(chars: &mut Peekable<Chars>) -> u8 {
    let mut dots = 0u8;
    while chars.peek() == Some(&'.') {
        dots += 1;
        chars.next();
    }
    dots
}

#[derive(Debug, Clone)]
enum Unit {
    Pitch {
        letter: char,
        accidental: Option<Accidental>,
        octave_marks: i32,
        note_type: NoteType,
        dots: u8,
    },
    Rest {
        kind: char,
        note_type: NoteType,
        dots: u8,
    },
}

/// Split one whitespace-delimited token into its component notes/rests —
/// letters are self-delimiting, so a word like `"Gc"` is two notes glommed
/// together with no separator, not one.
fn decompose_word(word: &str) -> Result<Vec<Unit>, EngraveError> {
    let mut chars = word.chars().peekable();
    let mut units = Vec::new();
    while let Some(&c) = chars.peek() {
        let lower = c.to_ascii_lowercase();
        if letter_pitch_offset(lower).is_some() {
            chars.next();
            let accidental = read_accidental(&mut chars);
            let (type_shift, octave_marks) = read_modifiers(&mut chars);
            let dots = read_dots(&mut chars);
            let base = if c.is_ascii_uppercase() { NoteType::Minim } else { NoteType::Crotchet };
            units.push(Unit::Pitch {
                letter: lower,
                accidental,
                octave_marks,
                note_type: base.shift(type_shift),
                dots,
            });
        } else if matches!(lower, 'r' | 's' | 'q' | 't') {
            chars.next();
            let (type_shift, _octave_marks) = read_modifiers(&mut chars);
            let dots = read_dots(&mut chars);
            let base = if c.is_ascii_uppercase() { NoteType::Minim } else { NoteType::Crotchet };
            units.push(Unit::Rest {
                kind: lower,
                note_type: base.shift(type_shift),
                dots,
            });
        } else {
            return Err(EngraveError::Message(format!(
                "'{word}' contains unrecognised character '{c}'"
            )));
        }
    }
    Ok(units)
}

/// Parser-local reading state: the persistent octave register, the active
/// key signature and its derived per-bar accidental table, and the last
/// note read (for `p`/`x<n>` duplication).
struct ReaderState {
    register: i32,
    prev_natural_pitch: Option<i32>,
    key: KeySignature,
    bar_accs: HashMap<char, Accidental>,
    last_note: Option<Note>,
}

impl ReaderState {
    fn new() -> Self {
        let key = KeySignature::C_MAJOR;
        Self {
            register: 0,
            prev_natural_pitch: None,
            bar_accs: bar_accidentals(key),
            key,
            last_note: None,
        }
    }

    fn start_bar(&mut self) {
        self.bar_accs = bar_accidentals(self.key);
    }

    fn set_key(&mut self, key: KeySignature) {
        self.key = key;
        self.bar_accs = bar_accidentals(key);
    }

    fn resolve_register(&mut self, letter_offset: i32, octave_marks: i32) -> i32 {
        let register = if octave_marks != 0 {
            self.register + octave_marks
        } else {
            match self.prev_natural_pitch {
                None => 0,
                Some(prev) => {
                    let mut best = self.register;
                    let mut best_dist = i32::MAX;
                    for delta in [0, -1, 1] {
                        let candidate_register = self.register + delta;
                        let candidate_pitch = candidate_register * OCTAVE_QUARTERTONES + letter_offset;
                        let dist = (candidate_pitch - prev).abs();
                        if dist < best_dist {
                            best_dist = dist;
                            best = candidate_register;
                        }
                    }
                    best
                }
            }
        };
        self.register = register;
        self.prev_natural_pitch = Some(register * OCTAVE_QUARTERTONES + letter_offset);
        register
    }

    fn build_pitched_note(
        &mut self,
        letter: char,
        accidental_explicit: Option<Accidental>,
        octave_marks: i32,
        note_type: NoteType,
        dots: u8,
    ) -> Note {
        let letter_offset = letter_pitch_offset(letter).unwrap();
        let stave_offset = letter_stave_offset(letter).unwrap();
        let register = self.resolve_register(letter_offset, octave_marks);

        let accidental = accidental_explicit.unwrap_or_else(|| {
            *self.bar_accs.get(&letter).unwrap_or(&Accidental::None)
        });
        if let Some(explicit) = accidental_explicit {
            self.bar_accs.insert(letter, explicit);
        }

        let natural_pitch = register * OCTAVE_QUARTERTONES + letter_offset;
        let abs_pitch = AbsPitch::new(AbsPitch::MIDDLE_C + natural_pitch + accidental.quartertones());
        let stave_pitch =
            StavePitch::new(StavePitch::BOTTOM_LINE + register * OCTAVE_STAVE_UNITS + stave_offset * 4);

        let note = Note {
            note_type,
            length: Tick::new(note_type.length_with_dots(dots)),
            dots,
            abs_pitch,
            stave_pitch,
            accidental,
            accidental_left_offset: 0,
            flags: NoteFlags::default(),
            accents: Default::default(),
            notehead: NoteheadStyle::Normal,
            masquerade: None,
        };
        self.last_note = Some(note.clone());
        note
    }
}

/// `r` (normal), `q` (quiet/invisible), `s` (doesn't pack into a multi-rest),
/// `t` (repeat-beat mark, prints like a crotchet rest). All are carried as
/// `Note`s with `no_play` set (see [`Note::is_rest`]) rather than a
/// dedicated rest item.
fn build_rest_note(kind: char, note_type: NoteType, dots: u8) -> Note {
    let mut flags = NoteFlags::default();
    flags.no_play = true;
    match kind {
        'q' => flags.hidden = true,
        's' => flags.stemless = true, // reused here to mean "excluded from multi-rest packing"
        't' => {
            flags.restrep = true;
            flags.stemless = true;
        }
        _ => {}
    }
    Note {
        note_type,
        length: Tick::new(note_type.length_with_dots(dots)),
        dots,
        abs_pitch: AbsPitch::new(AbsPitch::MIDDLE_C),
        stave_pitch: StavePitch::new(StavePitch::BOTTOM_LINE),
        accidental: Accidental::None,
        accidental_left_offset: 0,
        flags,
        accents: Default::default(),
        notehead: NoteheadStyle::Normal,
        masquerade: None,
    }
}

fn unit_to_note(state: &mut ReaderState, unit: Unit) -> Note {
    match unit {
        Unit::Pitch { letter, accidental, octave_marks, note_type, dots } => {
            state.build_pitched_note(letter, accidental, octave_marks, note_type, dots)
        }
        Unit::Rest { kind, note_type, dots } => build_rest_note(kind, note_type, dots),
    }
}

/// Bar-level parse result: the items in reading order (before insertion
/// into a [`crate::domain::bar::Bar`], which threads the chain), plus the
/// key signature in effect at the end of the source (for the reader to
/// open the stave with).
pub fn parse_bars(source: &str) -> Result<(Vec<Vec<ItemKind>>, KeySignature), EngraveError> {
    let tokens = Lexer::tokenize(source);
    let mut bars = Vec::new();
    let mut current: Vec<ItemKind> = Vec::new();
    let mut plet_buffer: Option<Vec<ItemKind>> = None;
    let mut state = ReaderState::new();
    state.start_bar();

    fn push_item(current: &mut Vec<ItemKind>, plet_buffer: &mut Option<Vec<ItemKind>>, item: ItemKind) {
        match plet_buffer.as_mut() {
            Some(buf) => buf.push(item),
            None => current.push(item),
        }
    }

    let mut iter = tokens.into_iter().peekable();
    while let Some(token) = iter.next() {
        match token {
            Token::Newline => continue,

            Token::Symbol('|') => {
                if matches!(iter.peek(), Some(Token::Symbol(':'))) {
                    iter.next();
                    if !current.is_empty() {
                        current.push(ItemKind::Barline(Barline { kind: BarlineType::Normal, style: 0 }));
                        bars.push(std::mem::take(&mut current));
                    }
                    current.push(ItemKind::RepeatLeft);
                } else {
                    current.push(ItemKind::Barline(Barline { kind: BarlineType::Normal, style: 0 }));
                    bars.push(std::mem::take(&mut current));
                    state.start_bar();
                }
            }
            Token::Symbol(':') => {
                if matches!(iter.peek(), Some(Token::Symbol('|'))) {
                    iter.next();
                    current.push(ItemKind::RepeatRight);
                    bars.push(std::mem::take(&mut current));
                    state.start_bar();
                }
                // a stray ':' with no following '|' is ignored.
            }

            Token::Symbol('_') => {
                push_item(
                    &mut current,
                    &mut plet_buffer,
                    ItemKind::Tie(Tie {
                        above_count: 0,
                        below_count: 0,
                        flags: TieFlags::default(),
                        preceding_note: None,
                    }),
                );
            }
            Token::Symbol(';') => {
                push_item(&mut current, &mut plet_buffer, ItemKind::BeamBreak(BeamBreak { level: 0 }));
            }
            Token::Symbol(',') => {
                let level = if let Some(Token::Word(w)) = iter.peek() {
                    if let Ok(n) = w.parse::<u8>() {
                        iter.next();
                        n
                    } else {
                        1
                    }
                } else {
                    1
                };
                push_item(&mut current, &mut plet_buffer, ItemKind::BeamBreak(BeamBreak { level }));
            }

            Token::Symbol('(') => {
                let mut pitches: Vec<(char, Option<Accidental>, i32)> = Vec::new();
                loop {
                    match iter.next() {
                        Some(Token::Word(w)) => {
                            for unit in decompose_word(&w)? {
                                match unit {
                                    Unit::Pitch { letter, accidental, octave_marks, .. } => {
                                        pitches.push((letter, accidental, octave_marks));
                                    }
                                    Unit::Rest { .. } => {
                                        return Err(EngraveError::Message(
                                            "rests cannot appear inside a chord".into(),
                                        ));
                                    }
                                }
                            }
                        }
                        Some(Token::Symbol(')')) => break,
                        Some(_) => {
                            return Err(EngraveError::Message("unexpected token inside '(...)' chord".into()));
                        }
                        None => {
                            return Err(EngraveError::Message("'(' chord with no matching ')'".into()));
                        }
                    }
                }
                let (type_shift, dots) = if let Some(Token::Word(w)) = iter.peek() {
                    if w.chars().next().map_or(false, |c| "=-+.".contains(c)) {
                        let w = match iter.next() {
                            Some(Token::Word(w)) => w,
                            _ => unreachable!(),
                        };
                        let mut chars = w.chars().peekable();
                        let (shift, _octave) = read_modifiers(&mut chars);
                        let dots = read_dots(&mut chars);
                        (shift, dots)
                    } else {
                        (0, 0)
                    }
                } else {
                    (0, 0)
                };
                let note_type = NoteType::Crotchet.shift(type_shift);
                for (i, (letter, accidental, octave_marks)) in pitches.into_iter().enumerate() {
                    let note = state.build_pitched_note(letter, accidental, octave_marks, note_type, dots);
                    let item = if i == 0 { ItemKind::Note(note) } else { ItemKind::ChordContinuation(note) };
                    push_item(&mut current, &mut plet_buffer, item);
                }
            }

            Token::Symbol('{') => {
                let mut pletlen: u8 = if let Some(Token::Word(w)) = iter.peek() {
                    if !w.is_empty() && w.chars().all(|c| c.is_ascii_digit()) {
                        let w = match iter.next() {
                            Some(Token::Word(w)) => w,
                            _ => unreachable!(),
                        };
                        w.parse().unwrap_or(3)
                    } else {
                        3
                    }
                } else {
                    3
                };
                let mut pletnum: Option<u8> = None;
                if matches!(iter.peek(), Some(Token::Symbol('/'))) {
                    iter.next();
                    if let Some(Token::Word(w)) = iter.next() {
                        pletnum = w.parse().ok();
                    }
                    if matches!(iter.peek(), Some(Token::Symbol('/'))) {
                        iter.next();
                        if let Some(Token::Word(w)) = iter.next() {
                            if let Ok(n) = w.parse() {
                                pletlen = n;
                            }
                        }
                    }
                }
                let pletnum = pletnum.unwrap_or_else(|| if pletlen.is_power_of_two() { 3 } else { 2 });

                plet_buffer = Some(Vec::new());
                current.push(ItemKind::TupletStart(TupletStart {
                    numerator: pletlen,
                    denominator: pletnum,
                    flags: Default::default(),
                    x_adjust: 0,
                }));
            }
            Token::Symbol('}') => {
                let items = plet_buffer.take().ok_or_else(|| {
                    EngraveError::Message("'}' with no matching '{'".into())
                })?;
                let (pletlen, pletnum) = match current.iter().rev().find_map(|k| match k {
                    ItemKind::TupletStart(t) => Some((t.numerator, t.denominator)),
                    _ => None,
                }) {
                    Some(pair) => pair,
                    None => (3, 2),
                };
                for item in items {
                    let scaled = match item {
                        ItemKind::Note(mut n) => {
                            n.length = Tick::new(n.length.value() * pletnum as i64 / pletlen as i64);
                            ItemKind::Note(n)
                        }
                        ItemKind::ChordContinuation(mut n) => {
                            n.length = Tick::new(n.length.value() * pletnum as i64 / pletlen as i64);
                            ItemKind::ChordContinuation(n)
                        }
                        other => other,
                    };
                    current.push(scaled);
                }
                current.push(ItemKind::TupletEnd(TupletEnd));
            }
            Token::Symbol('/') => {
                // only meaningful right after '{'/'}', handled there; a stray
                // '/' elsewhere is ignored.
            }
            Token::Symbol(c) => {
                return Err(EngraveError::Message(format!("unexpected symbol '{c}'")));
            }

            Token::Word(word) if word == "key" => {
                let name = match iter.next() {
                    Some(Token::Word(w)) => w,
                    _ => return Err(EngraveError::Message("'key' with no key name".into())),
                };
                let sharps = *KEY_NAMES
                    .get(name.as_str())
                    .ok_or_else(|| EngraveError::Message(format!("unknown key '{name}'")))?;
                let key = KeySignature::standard(sharps).map_err(|e| EngraveError::Message(e.into()))?;
                state.set_key(key);
                push_item(
                    &mut current,
                    &mut plet_buffer,
                    ItemKind::KeyChange(SignatureChange { value: key, suppress: false, assume: false }),
                );
            }
            Token::Word(word) if word == "p" => {
                let note = state
                    .last_note
                    .clone()
                    .ok_or_else(|| EngraveError::Message("'p' with no preceding note".into()))?;
                push_item(&mut current, &mut plet_buffer, ItemKind::Note(note));
            }
            Token::Word(word)
                if word.starts_with('x') && word.len() > 1 && word[1..].chars().all(|c| c.is_ascii_digit()) =>
            {
                let count: usize = word[1..].parse().unwrap_or(1);
                let note = state
                    .last_note
                    .clone()
                    .ok_or_else(|| EngraveError::Message("'x<n>' with no preceding note".into()))?;
                for _ in 0..count {
                    push_item(&mut current, &mut plet_buffer, ItemKind::Note(note.clone()));
                }
            }
            Token::Word(word) => {
                for unit in decompose_word(&word)? {
                    let note = unit_to_note(&mut state, unit);
                    push_item(&mut current, &mut plet_buffer, ItemKind::Note(note));
                }
            }
        }
    }

    if !current.is_empty() {
        bars.push(current);
    }

    Ok((bars, state.key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars_only(source: &str) -> Vec<Vec<ItemKind>> {
        parse_bars(source).unwrap().0
    }

    #[test]
    fn parses_a_simple_ascending_run() {
        let bars = bars_only("c d e f |");
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].len(), 5); // 4 notes + barline
        assert!(bars[0][4].is_barline());
        let pitches: Vec<i32> = bars[0][0..4]
            .iter()
            .map(|k| k.as_note().unwrap().abs_pitch.value())
            .collect();
        // each successive letter lands on whichever neighbouring register is
        // closest to the previous note, so a diatonic run stays contiguous.
        for pair in pitches.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn uppercase_defaults_to_minim_lowercase_to_crotchet() {
        let bars = bars_only("G c |");
        assert_eq!(bars[0][0].as_note().unwrap().note_type, NoteType::Minim);
        assert_eq!(bars[0][1].as_note().unwrap().note_type, NoteType::Crotchet);
    }

    #[test]
    fn duration_modifiers_shift_the_note_type() {
        let bars = bars_only("c- |");
        // lowercase c defaults to crotchet; '-' shifts one step shorter.
        assert_eq!(bars[0][0].as_note().unwrap().note_type, NoteType::Quaver);
    }

    #[test]
    fn multi_note_words_decompose_without_a_separator() {
        let bars = bars_only("Gc |");
        assert_eq!(bars[0].len(), 3); // G, c, barline
        assert_eq!(bars[0][0].as_note().unwrap().note_type, NoteType::Minim);
        assert_eq!(bars[0][1].as_note().unwrap().note_type, NoteType::Crotchet);
    }

    #[test]
    fn sharp_accidental_raises_pitch_by_two_quartertones() {
        let bars = bars_only("c c# |");
        let plain = bars[0][0].as_note().unwrap().abs_pitch.value();
        let sharp = bars[0][1].as_note().unwrap().abs_pitch.value();
        assert_eq!(sharp, plain + 2);
    }

    #[test]
    fn explicit_accidental_persists_for_the_rest_of_the_bar() {
        let bars = bars_only("c# c |");
        let first = bars[0][0].as_note().unwrap();
        let second = bars[0][1].as_note().unwrap();
        assert_eq!(first.accidental, Accidental::Sharp);
        assert_eq!(second.accidental, Accidental::Sharp);
    }

    #[test]
    fn octave_mark_overrides_the_nearest_register_search() {
        let bars = bars_only("c c' |");
        let low = bars[0][0].as_note().unwrap().abs_pitch.value();
        let high = bars[0][1].as_note().unwrap().abs_pitch.value();
        assert_eq!(high, low + OCTAVE_QUARTERTONES);
    }

    #[test]
    fn rests_do_not_play_and_carry_their_letter_specific_flags() {
        let bars = bars_only("r q s t |");
        let flags: Vec<_> = bars[0][0..4].iter().map(|k| k.as_note().unwrap().flags).collect();
        assert!(flags.iter().all(|f| f.no_play));
        assert!(flags[1].hidden);
        assert!(flags[2].stemless);
        assert!(flags[3].restrep);
    }

    #[test]
    fn tie_symbol_produces_a_tie_item_after_its_note() {
        let bars = bars_only("c_ c |");
        assert!(matches!(bars[0][1], ItemKind::Tie(_)));
    }

    #[test]
    fn repeat_barlines_open_and_close_a_section() {
        let bars = bars_only("|: c d |\ne f :|");
        assert!(matches!(bars[0][0], ItemKind::RepeatLeft));
        assert!(matches!(bars[1].last().unwrap(), ItemKind::RepeatRight));
    }

    #[test]
    fn duplication_p_repeats_previous_note() {
        let bars = bars_only("c p p |");
        assert_eq!(bars[0].len(), 4);
        for item in &bars[0][0..3] {
            assert_eq!(item.as_note().unwrap().abs_pitch, bars[0][0].as_note().unwrap().abs_pitch);
        }
    }

    #[test]
    fn x_n_repeats_previous_note_n_times() {
        let bars = bars_only("d x3 |");
        assert_eq!(bars[0].len(), 5); // 1 + 3 repeats + barline
    }

    #[test]
    fn plet_bracket_with_only_a_length_digit_gets_the_documented_default_pletnum() {
        // pletlen=3 is not a power of two, so pletnum defaults to 2.
        let bars = bars_only("{3 c- c- c- } |");
        let start = bars[0].iter().find_map(|k| match k {
            ItemKind::TupletStart(t) => Some(t),
            _ => None,
        });
        let start = start.unwrap();
        assert_eq!(start.numerator, 3);
        assert_eq!(start.denominator, 2);
    }

    #[test]
    fn plet_bracket_scales_member_note_lengths_by_pletnum_over_pletlen() {
        let bars = bars_only("{3 c- c- c- } |");
        let quaver = NoteType::Quaver.base_ticks();
        let first_note = bars[0].iter().find_map(|k| k.as_note()).unwrap();
        assert_eq!(first_note.length.value(), quaver * 2 / 3);
    }

    #[test]
    fn parenthesised_chord_shares_one_duration_across_its_members() {
        let bars = bars_only("(ceg)- |");
        let notes: Vec<_> = bars[0][0..3].iter().map(|k| k.as_note().unwrap()).collect();
        assert!(matches!(bars[0][0], ItemKind::Note(_)));
        assert!(matches!(bars[0][1], ItemKind::ChordContinuation(_)));
        assert!(matches!(bars[0][2], ItemKind::ChordContinuation(_)));
        assert!(notes.iter().all(|n| n.note_type == NoteType::Quaver));
    }

    #[test]
    fn key_directive_sets_the_accidental_table() {
        let (bars, key) = parse_bars("key F# c |").unwrap();
        assert_eq!(key, KeySignature::Standard(6));
        // F# major has an F in its signature, so a bare 'f' later would read
        // sharp; here we only assert the directive produced a KeyChange item.
        assert!(matches!(bars[0][0], ItemKind::KeyChange(_)));
    }
}

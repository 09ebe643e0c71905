//! Scalar value types shared across the IR: musical time, pitch, clefs,
//! key signatures, note types, accidentals.

use serde::{Deserialize, Serialize};

/// One breve (the longest written note value) in musical-time ticks.
/// Divisible by 2, 3, 5, 7, 8, 11 and 13 so that tuplets of those arities
/// (and their combinations) land on integer tick boundaries.
pub const BREVE_TICKS: i64 = 240_240;

/// Musical offset within a bar, or a note/rest duration, in ticks.
/// A fraction of a breve (see [`BREVE_TICKS`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tick(pub i64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(self) -> i64 {
        self.0
    }

    pub fn add(self, other: Tick) -> Self {
        Self(self.0 + other.0)
    }

    pub fn sub(self, other: Tick) -> Self {
        Self(self.0 - other.0)
    }
}

impl std::ops::Add for Tick {
    type Output = Tick;
    fn add(self, rhs: Tick) -> Tick {
        Tick(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Tick {
    type Output = Tick;
    fn sub(self, rhs: Tick) -> Tick {
        Tick(self.0 - rhs.0)
    }
}

/// Tolerance (in ticks) within which a bar's accumulated note length may
/// differ from the time signature's measure length before the bar-length
/// check (Testable Property 3) fires. Scaled from the original tuplet
/// rounding tolerance.
pub const TUPLET_ROUND: i64 = BREVE_TICKS / 240_240 * 4; // = 4 ticks

/// Absolute pitch in quarter-tones; middle C = 96 (Testable Property 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AbsPitch(pub i32);

impl AbsPitch {
    pub const MIDDLE_C: i32 = 96;

    pub fn new(value: i32) -> Self {
        Self(value)
    }

    pub fn value(self) -> i32 {
        self.0
    }
}

/// Stave-relative printing pitch. Bottom line = 256, one whole tone = 4
/// units (so a semitone step on the stave is 2 units).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StavePitch(pub i32);

impl StavePitch {
    pub const BOTTOM_LINE: i32 = 256;

    pub fn new(value: i32) -> Self {
        Self(value)
    }

    pub fn value(self) -> i32 {
        self.0
    }
}

/// Clef in effect on a stave at a given point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Clef {
    Treble,
    Bass,
    Alto,
    Tenor,
    TrebleOctaveDown,
    TrebleOctaveUp,
    BassOctaveDown,
}

impl Clef {
    /// Stave-pitch of the reference line/space used to derive `stave_pitch`
    /// from `abs_pitch` (Testable Property 1: `pitch_clef[current_clef]`).
    pub fn pitch_offset(self) -> i32 {
        match self {
            Clef::Treble => 0,
            Clef::Bass => -48,
            Clef::Alto => -24,
            Clef::Tenor => -36,
            Clef::TrebleOctaveDown => -56,
            Clef::TrebleOctaveUp => 56,
            Clef::BassOctaveDown => -104,
        }
    }
}

/// Key signature: sharps (positive) / flats (negative) count for standard
/// keys, or an index into a movement's custom-key pool (§4.2 point 6) for
/// key signatures built from an explicit accidental list not expressible as
/// a simple sharps/flats count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeySignature {
    Standard(i8),
    Custom(u16),
}

impl KeySignature {
    pub const C_MAJOR: KeySignature = KeySignature::Standard(0);

    pub fn standard(sharps: i8) -> Result<Self, &'static str> {
        if !(-7..=7).contains(&sharps) {
            return Err("key signature must be in range -7 (flats) to 7 (sharps)");
        }
        Ok(KeySignature::Standard(sharps))
    }
}

/// Accidental kind carried by a note or key-signature table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Accidental {
    None,
    Natural,
    Sharp,
    Flat,
    DoubleSharp,
    DoubleFlat,
    NaturalSharp,
    NaturalFlat,
}

impl Accidental {
    /// Offset in quarter-tones this accidental applies relative to the
    /// unaltered pitch.
    pub fn quartertones(self) -> i32 {
        match self {
            Accidental::None => 0,
            Accidental::Natural => 0,
            Accidental::Sharp | Accidental::NaturalSharp => 2,
            Accidental::Flat | Accidental::NaturalFlat => -2,
            Accidental::DoubleSharp => 4,
            Accidental::DoubleFlat => -4,
        }
    }
}

/// Written note-type (duration class before dots/tuplet adjustment), from
/// breve down to 128th, per §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NoteType {
    Breve,
    Semibreve,
    Minim,
    Crotchet,
    Quaver,
    Semiquaver,
    Demisemiquaver,
    Hemidemisemiquaver,
    Semihemidemisemiquaver,
    DemisemihemidemisemiQuaver128,
}

impl NoteType {
    /// Undotted length of this note-type in ticks.
    pub fn base_ticks(self) -> i64 {
        use NoteType::*;
        match self {
            Breve => BREVE_TICKS,
            Semibreve => BREVE_TICKS / 2,
            Minim => BREVE_TICKS / 4,
            Crotchet => BREVE_TICKS / 8,
            Quaver => BREVE_TICKS / 16,
            Semiquaver => BREVE_TICKS / 32,
            Demisemiquaver => BREVE_TICKS / 64,
            Hemidemisemiquaver => BREVE_TICKS / 128,
            Semihemidemisemiquaver => BREVE_TICKS / 256,
            DemisemihemidemisemiQuaver128 => BREVE_TICKS / 512,
        }
    }

    /// Length in ticks after applying `dots` augmentation dots
    /// (each dot adds half of the remaining value).
    pub fn length_with_dots(self, dots: u8) -> i64 {
        let base = self.base_ticks();
        let mut total = base;
        let mut add = base;
        for _ in 0..dots {
            add /= 2;
            total += add;
        }
        total
    }

    /// Step `steps` positions along the breve..128th ordering (positive
    /// shortens, negative lengthens), clamped to the ends of the scale
    /// rather than wrapping or erroring — a note-type modifier run longer
    /// than the scale just bottoms/tops out.
    pub fn shift(self, steps: i32) -> NoteType {
        const ORDER: [NoteType; 10] = [
            NoteType::Breve,
            NoteType::Semibreve,
            NoteType::Minim,
            NoteType::Crotchet,
            NoteType::Quaver,
            NoteType::Semiquaver,
            NoteType::Demisemiquaver,
            NoteType::Hemidemisemiquaver,
            NoteType::Semihemidemisemiquaver,
            NoteType::DemisemihemidemisemiQuaver128,
        ];
        let here = ORDER.iter().position(|&t| t == self).unwrap() as i32;
        let clamped = (here + steps).clamp(0, ORDER.len() as i32 - 1);
        ORDER[clamped as usize]
    }
}

/// Stem direction, resolved by `post_note` / `setbeamstems` (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StemDirection {
    Up,
    Down,
}

/// Per-movement policy for notes exactly on the stem-swap level (§4.1 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StemSwapPolicy {
    FollowPrevious,
    Up,
    Down,
    Defer,
}

impl Default for StemSwapPolicy {
    fn default() -> Self {
        StemSwapPolicy::FollowPrevious
    }
}

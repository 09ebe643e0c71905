//! Bar-item intermeditate representation (§3).
//!
//! The IR is a closed-set tagged union: each bar-item variant carries only
//! the fields it needs. Items live in `Bar::items` (a flat `Vec<Item>`) and
//! form a doubly linked chain via `prev`/`next` indices into that vector —
//! the arena-with-stable-indices approach from the REDESIGN notes, used in
//! place of the original's raw-pointer cyclic list.

use super::ids::ItemIndex;
use super::value_objects::{Accidental, AbsPitch, Clef, KeySignature, NoteType, StavePitch, Tick};
use serde::{Deserialize, Serialize};

/// One node in a bar's doubly linked item chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub prev: Option<ItemIndex>,
    pub next: Option<ItemIndex>,
    pub kind: ItemKind,
}

impl Item {
    pub fn new(kind: ItemKind) -> Self {
        Self {
            prev: None,
            next: None,
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarlineType {
    Normal,
    Double,
    Ending,
    Invisible,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Barline {
    pub kind: BarlineType,
    pub style: u8,
}

/// Bit flags a note or chord-continuation carries. Hand-rolled rather than a
/// bitflags crate so each flag reads as a named field, matching the field
/// style used for note flags elsewhere in this IR.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NoteFlags {
    pub stem_up: bool,
    pub stemless: bool,
    pub coupled_up: bool,
    pub coupled_down: bool,
    pub invert_head: bool,
    pub dot_right: bool,
    pub centre_rest: bool,
    pub hidden: bool,
    pub grace: bool,
    pub appoggiatura: bool,
    pub small_head: bool,
    pub restrep: bool,
    pub highdot: bool,
    pub lowdot: bool,
    pub accidental_invisible: bool,
    pub accidental_bracket_round: bool,
    pub accidental_bracket_square: bool,
    pub tied_from: bool,
    pub no_play: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AccentFlags {
    pub staccato: bool,
    pub bar_accent: bool,
    pub gt_accent: bool,
    pub wedge: bool,
    pub teepee: bool,
    pub bow_down: bool,
    pub bow_up: bool,
    pub ring: bool,
    pub vertical_line: bool,
    pub staccatissimo: bool,
    pub opposite_side: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteheadStyle {
    Normal,
    Cross,
    Diamond,
    Triangle,
    NoNotehead,
}

/// A note that begins a single note, or the first note of a chord. Further
/// chord members appear as [`ItemKind::ChordContinuation`] in the same chain
/// (§3 invariant: "the first has *note* type, the rest *chord-continuation*").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub note_type: NoteType,
    pub length: Tick,
    pub dots: u8,
    pub abs_pitch: AbsPitch,
    pub stave_pitch: StavePitch,
    pub accidental: Accidental,
    pub accidental_left_offset: i32,
    pub flags: NoteFlags,
    pub accents: AccentFlags,
    pub notehead: NoteheadStyle,
    pub masquerade: Option<NoteType>,
}

impl Note {
    pub fn stem_direction_bit(&self) -> bool {
        self.flags.stem_up
    }

    /// A rest is carried as a `Note` with `no_play` set rather than a
    /// separate item variant: it already has every field a rest needs
    /// (length, dots, flags for invisible/repeat-bar/no-pack variants) and
    /// nothing downstream has to special-case a second kind of chain node.
    pub fn is_rest(&self) -> bool {
        self.flags.no_play
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrnamentKind {
    Trill,
    Mordent,
    Turn,
    Arpeggio,
    Fermata,
    Tremolo(u8),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ornament {
    pub kind: OrnamentKind,
    pub above: bool,
    pub x_offset: i32,
    pub y_offset: i32,
    pub bracketed: bool,
    pub trill_accidental: Option<Accidental>,
}

/// Encoded text run: top byte of each unit is a font id, bottom 24 bits a
/// code point or escape value (§9 design note on text strings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextUnit(pub u32);

impl TextUnit {
    pub fn new(font_id: u8, code_point: u32) -> Self {
        debug_assert!(code_point <= 0x00FF_FFFF);
        TextUnit(((font_id as u32) << 24) | (code_point & 0x00FF_FFFF))
    }

    pub fn font_id(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn code_point(self) -> u32 {
        self.0 & 0x00FF_FFFF
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextFlags {
    pub above: bool,
    pub centre: bool,
    pub end_align: bool,
    pub boxed: bool,
    pub rounded_box: bool,
    pub ringed: bool,
    pub rehearsal: bool,
    pub bar_aligned: bool,
    pub time_aligned: bool,
    pub underlay: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextItem {
    pub string: Vec<TextUnit>,
    pub size_index: u8,
    pub x_offset: i32,
    pub y_offset: i32,
    pub rotation: i32,
    pub flags: TextFlags,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlurFlags {
    pub below: bool,
    pub wiggly: bool,
    pub dashed: bool,
    pub dotted: bool,
    pub editorial: bool,
    pub crossing: bool,
    pub line_mode: bool,
    pub open_left: bool,
    pub open_right: bool,
    pub horizontal: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlurStart {
    pub id: char,
    pub flags: SlurFlags,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlurEnd {
    pub id: char,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TieFlags {
    pub slur_like: bool,
    pub glissando: bool,
    pub editorial: bool,
    pub dashed: bool,
    pub dotted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tie {
    pub above_count: u8,
    pub below_count: u8,
    pub flags: TieFlags,
    pub preceding_note: Option<ItemIndex>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HairpinKind {
    Crescendo,
    Decrescendo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HairpinStart {
    pub kind: HairpinKind,
    pub below: bool,
    pub open_width: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HairpinEnd {
    pub end_mark: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TupletFlags {
    pub above: bool,
    pub invert_left_jog: bool,
    pub invert_right_jog: bool,
    pub no_mark: bool,
    pub no_bracket: bool,
    pub force_bracket: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TupletStart {
    pub numerator: u8,
    pub denominator: u8,
    pub flags: TupletFlags,
    pub x_adjust: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TupletEnd;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeamBreak {
    /// Break level 0..7, or 255 meaning "all levels".
    pub level: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceDirective {
    pub x: i32,
    pub relative: bool,
}

/// Time/key/clef change item: each carries the new value plus `suppress`
/// (don't print at line start) and `assume` (announce as cautionary) flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureChange<T> {
    pub value: T,
    pub suppress: bool,
    pub assume: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSignature {
    pub beats: u8,
    pub beat_type: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NthTimeBar {
    pub n: Vec<u8>,
    pub custom_text: Option<String>,
    pub offset: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidiChange {
    pub transpose: Option<i8>,
    pub channel: Option<u8>,
    pub voice: Option<u8>,
    pub volume: Option<u8>,
    pub note_pitch: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawInvocation {
    pub procedure_name: String,
    pub args: Vec<crate::draw::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Footnote {
    pub lines: Vec<Vec<TextUnit>>,
}

/// The closed set of bar-item variants (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ItemKind {
    // Structural
    Barline(Barline),
    RepeatLeft,
    RepeatRight,
    NthTimeBar(NthTimeBar),
    EndOfNthBars,
    BeamOverBarline,
    ResetToOffsetZero,
    BarNumberOverride(i32),

    // Time/key/clef
    TimeChange(SignatureChange<TimeSignature>),
    KeyChange(SignatureChange<KeySignature>),
    ClefChange(SignatureChange<Clef>),

    // Notes & chords
    Note(Note),
    ChordContinuation(Note),

    // Ornaments
    Ornament(Ornament),

    // Text
    Text(TextItem),

    // Slur/Line
    SlurStart(SlurStart),
    SlurEnd(SlurEnd),

    // Tie
    Tie(Tie),

    // Hairpin
    HairpinStart(HairpinStart),
    HairpinEnd(HairpinEnd),

    // Tuplet
    TupletStart(TupletStart),
    TupletEnd(TupletEnd),

    // Beam controls
    BeamBreak(BeamBreak),
    BeamSlopeOverride(i32),
    BeamMove(i32),

    // Layout & spacing
    Space(SpaceDirective),
    EnsureSpace(i32),
    NoteSpacingMultiplier(f64),
    SystemGapHere(i32),
    StaveSpacingHere(i32),
    PageBreak,
    NewLine,
    NewPage,
    Justify { horizontal: bool, add: bool },

    // MIDI
    MidiChange(MidiChange),

    // Draw invocation
    Draw(DrawInvocation),

    // Footnote
    Footnote(Footnote),
}

impl ItemKind {
    pub fn is_barline(&self) -> bool {
        matches!(self, ItemKind::Barline(_) | ItemKind::RepeatRight)
    }

    pub fn as_note(&self) -> Option<&Note> {
        match self {
            ItemKind::Note(n) | ItemKind::ChordContinuation(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_note_mut(&mut self) -> Option<&mut Note> {
        match self {
            ItemKind::Note(n) | ItemKind::ChordContinuation(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_chord_first(&self) -> bool {
        matches!(self, ItemKind::Note(_))
    }
}

//! Intermediate (pre-conversion) representation of a parsed MusicXML
//! document — a thin, mostly-string-typed mirror of the element tree, kept
//! separate from the engine's own IR so the streaming parser never has to
//! know about bar-items, ticks, or stave pitches.

#[derive(Debug, Clone, Default)]
pub struct ScorePartwiseData {
    pub part_list: Vec<PartListEntry>,
    pub parts: Vec<PartData>,
}

#[derive(Debug, Clone)]
pub struct PartListEntry {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct PartData {
    pub id: String,
    pub measures: Vec<MeasureData>,
}

#[derive(Debug, Clone, Default)]
pub struct MeasureData {
    pub number: String,
    pub attributes: Option<AttributesData>,
    pub notes: Vec<NoteData>,
    pub backups: Vec<BackupForward>,
}

#[derive(Debug, Clone, Copy)]
pub enum BackupForward {
    Backup { duration: i64, after_note_index: usize },
    Forward { duration: i64, after_note_index: usize },
}

#[derive(Debug, Clone, Default)]
pub struct AttributesData {
    pub divisions: Option<i64>,
    pub fifths: Option<i32>,
    pub mode: Option<String>,
    pub beats: Option<u8>,
    pub beat_type: Option<u8>,
    pub clef_sign: Option<String>,
    pub clef_line: Option<i32>,
    pub clef_octave_change: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct PitchData {
    pub step: char,
    pub alter: i32,
    pub octave: i32,
}

#[derive(Debug, Clone, Default)]
pub struct NoteData {
    pub pitch: Option<PitchData>,
    pub is_rest: bool,
    pub duration: i64,
    pub note_type: Option<String>,
    pub dots: u8,
    pub chord: bool,
    pub voice: Option<String>,
    pub staff: Option<u8>,
    pub tie_start: bool,
    pub tie_stop: bool,
    pub accidental: Option<String>,
    pub time_mod_actual: Option<u32>,
    pub time_mod_normal: Option<u32>,
}

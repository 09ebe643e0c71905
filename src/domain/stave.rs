//! Stave aggregate: a named line of music within a movement, holding the
//! bar sequence and the clef/key/instrument context it starts with.

use super::bar::Bar;
use super::ids::{BarIndex, StaveId};
use super::value_objects::{Clef, KeySignature};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StaveKind {
    Normal,
    Percussion,
    TabLines(u8),
}

/// A stave's participation in the current system/page layout: which staves
/// print together is decided per-movement, but a stave can additionally be
/// hidden for stretches of bars (cue-sized ossia, optional doubling part).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaveVisibility {
    /// Bar indices at which this stave is hidden from printed output
    /// (still engraved for MIDI purposes).
    hidden_ranges: Vec<(BarIndex, BarIndex)>,
}

impl StaveVisibility {
    pub fn hide_range(&mut self, from: BarIndex, to: BarIndex) {
        self.hidden_ranges.push((from, to));
    }

    pub fn is_hidden_at(&self, bar: BarIndex) -> bool {
        self.hidden_ranges
            .iter()
            .any(|&(from, to)| bar >= from && bar <= to)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stave {
    pub id: StaveId,
    pub name: String,
    pub short_name: Option<String>,
    pub kind: StaveKind,
    pub initial_clef: Clef,
    pub initial_key: KeySignature,
    /// Fraction of normal size (cue staves etc.); 1.0 = normal.
    pub size_scale: f64,
    pub visibility: StaveVisibility,
    bars: Vec<Bar>,
}

impl Stave {
    pub fn new(name: impl Into<String>, initial_clef: Clef, initial_key: KeySignature) -> Self {
        Self {
            id: StaveId::new(),
            name: name.into(),
            short_name: None,
            kind: StaveKind::Normal,
            initial_clef,
            initial_key,
            size_scale: 1.0,
            visibility: StaveVisibility::default(),
            bars: Vec::new(),
        }
    }

    pub fn with_short_name(mut self, short_name: impl Into<String>) -> Self {
        self.short_name = Some(short_name.into());
        self
    }

    pub fn with_kind(mut self, kind: StaveKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn push_bar(&mut self, bar: Bar) -> BarIndex {
        let idx = BarIndex(self.bars.len());
        self.bars.push(bar);
        idx
    }

    pub fn bar(&self, idx: BarIndex) -> &Bar {
        &self.bars[idx.0]
    }

    pub fn bar_mut(&mut self, idx: BarIndex) -> &mut Bar {
        &mut self.bars[idx.0]
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn is_visible_at(&self, bar: BarIndex) -> bool {
        !self.visibility.is_hidden_at(bar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_stave_has_no_bars() {
        let stave = Stave::new("Violin I", Clef::Treble, KeySignature::C_MAJOR);
        assert_eq!(stave.bar_count(), 0);
    }

    #[test]
    fn push_bar_returns_sequential_indices() {
        let mut stave = Stave::new("Cello", Clef::Bass, KeySignature::C_MAJOR);
        let a = stave.push_bar(Bar::new());
        let b = stave.push_bar(Bar::new());
        assert_eq!(a, BarIndex(0));
        assert_eq!(b, BarIndex(1));
        assert_eq!(stave.bar_count(), 2);
    }

    #[test]
    fn hidden_range_marks_visibility() {
        let mut stave = Stave::new("Ossia", Clef::Treble, KeySignature::C_MAJOR);
        stave.push_bar(Bar::new());
        stave.push_bar(Bar::new());
        stave.push_bar(Bar::new());
        stave.visibility.hide_range(BarIndex(1), BarIndex(1));
        assert!(stave.is_visible_at(BarIndex(0)));
        assert!(!stave.is_visible_at(BarIndex(1)));
        assert!(stave.is_visible_at(BarIndex(2)));
    }
}

//! Movement aggregate: a complete engraved work, owning its staves and the
//! absolute-bar-index to logical-bar-number mapping (§3, §4.5).

use super::errors::Diagnostics;
use super::ids::{BarIndex, MovementId, StaveId};
use super::stave::Stave;
use serde::{Deserialize, Serialize};

/// A logical bar number, possibly fractional (a pickup/anacrusis bar shares
/// the number of the bar it completes, printed as e.g. "12a").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarNumber {
    pub number: i32,
    pub fraction: Option<char>,
}

impl BarNumber {
    pub fn whole(number: i32) -> Self {
        Self {
            number,
            fraction: None,
        }
    }

    pub fn fractional(number: i32, fraction: char) -> Self {
        Self {
            number,
            fraction: Some(fraction),
        }
    }
}

impl std::fmt::Display for BarNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.fraction {
            Some(c) => write!(f, "{}{}", self.number, c),
            None => write!(f, "{}", self.number),
        }
    }
}

/// Which staves are selected to print together as a system, stored as a
/// bitmap rather than a `Vec<StaveId>` so membership tests are O(1) and a
/// movement can hold many such selections (one per system-break directive)
/// cheaply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaveSelection(u64);

impl StaveSelection {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn all(count: usize) -> Self {
        if count >= 64 {
            Self(u64::MAX)
        } else {
            Self((1u64 << count) - 1)
        }
    }

    pub fn insert(&mut self, index: usize) {
        if index < 64 {
            self.0 |= 1 << index;
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        index < 64 && (self.0 & (1 << index)) != 0
    }

    pub fn count(&self) -> u32 {
        self.0.count_ones()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub title: Option<String>,
    staves: Vec<Stave>,
    /// Logical number assigned to each absolute bar index, shared across all
    /// staves (every stave has the same number of bars by construction;
    /// enforced at readers, not re-validated here).
    bar_numbers: Vec<BarNumber>,
    /// Per-system stave selections recorded during reading (native
    /// `*selstaves`/`*endselstaves` or the MusicXML part-list grouping).
    pub stave_selections: Vec<StaveSelection>,
}

impl Movement {
    pub fn new() -> Self {
        Self {
            id: MovementId::new(),
            title: None,
            staves: Vec::new(),
            bar_numbers: Vec::new(),
            stave_selections: Vec::new(),
        }
    }

    pub fn add_stave(&mut self, stave: Stave) -> usize {
        let idx = self.staves.len();
        self.staves.push(stave);
        idx
    }

    pub fn stave(&self, index: usize) -> &Stave {
        &self.staves[index]
    }

    pub fn stave_mut(&mut self, index: usize) -> &mut Stave {
        &mut self.staves[index]
    }

    pub fn stave_by_id(&self, id: StaveId) -> Option<&Stave> {
        self.staves.iter().find(|s| s.id == id)
    }

    pub fn staves(&self) -> &[Stave] {
        &self.staves
    }

    pub fn stave_count(&self) -> usize {
        self.staves.len()
    }

    /// Assign logical bar numbers for `bar_count` bars, renumbering from
    /// `start` and treating every `fraction_at` index as sharing the
    /// preceding whole number (pickup-bar convention).
    pub fn assign_bar_numbers(&mut self, bar_count: usize, start: i32, pickup_at: Option<usize>) {
        self.bar_numbers.clear();
        let mut number = start;
        for i in 0..bar_count {
            if Some(i) == pickup_at {
                self.bar_numbers.push(BarNumber::fractional(number - 1, 'a'));
            } else {
                self.bar_numbers.push(BarNumber::whole(number));
                number += 1;
            }
        }
    }

    pub fn bar_number(&self, bar: BarIndex) -> Option<BarNumber> {
        self.bar_numbers.get(bar.0).copied()
    }

    /// §3 structural invariant: every stave's bar count matches. Reported as
    /// a diagnostic so a malformed import doesn't panic the pipeline.
    pub fn check_bar_counts_consistent(&self, diagnostics: &mut Diagnostics) {
        let expected = self.staves.first().map(|s| s.bar_count());
        if let Some(expected) = expected {
            for stave in &self.staves {
                if stave.bar_count() != expected {
                    let _ = diagnostics.report(
                        super::errors::Severity::Major,
                        "STAVE_BAR_COUNT_MISMATCH",
                        vec![stave.name.clone()],
                        None,
                        None,
                    );
                }
            }
        }
    }
}

impl Default for Movement {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{Clef, KeySignature};

    #[test]
    fn pickup_bar_shares_number_with_following_bar() {
        let mut movement = Movement::new();
        movement.assign_bar_numbers(3, 1, Some(0));
        assert_eq!(movement.bar_number(BarIndex(0)).unwrap().to_string(), "0a");
        assert_eq!(movement.bar_number(BarIndex(1)).unwrap().to_string(), "1");
        assert_eq!(movement.bar_number(BarIndex(2)).unwrap().to_string(), "2");
    }

    #[test]
    fn stave_selection_tracks_membership() {
        let mut sel = StaveSelection::empty();
        sel.insert(0);
        sel.insert(2);
        assert!(sel.contains(0));
        assert!(!sel.contains(1));
        assert!(sel.contains(2));
        assert_eq!(sel.count(), 2);
    }

    #[test]
    fn bar_count_mismatch_is_reported() {
        let mut movement = Movement::new();
        let mut a = Stave::new("A", Clef::Treble, KeySignature::C_MAJOR);
        a.push_bar(super::super::bar::Bar::new());
        a.push_bar(super::super::bar::Bar::new());
        let mut b = Stave::new("B", Clef::Bass, KeySignature::C_MAJOR);
        b.push_bar(super::super::bar::Bar::new());
        movement.add_stave(a);
        movement.add_stave(b);

        let mut diagnostics = Diagnostics::new(None);
        movement.check_bar_counts_consistent(&mut diagnostics);
        assert_eq!(diagnostics.error_count(), 1);
    }
}

//! Stem direction selection (§4.1).
//!
//! `post_note` resolves a single note or chord's stem direction by a
//! four-priority cascade: explicit coupling, the stem-swap boundary policy,
//! position relative to the stave centre, and — for chords — the most
//! extreme member pitch. `setbeamstems` then unifies the direction across
//! an entire beamed group, since a beam is drawn as one straight stem run
//! and cannot have some stems pointing up and others down.

use crate::domain::bar::Bar;
use crate::domain::ids::ItemIndex;
use crate::domain::value_objects::{StavePitch, StemDirection, StemSwapPolicy};

/// Stave-pitch of the centre line of a standard 5-line stave: two tones
/// above the bottom line.
pub const STAVE_CENTER: i32 = StavePitch::BOTTOM_LINE + 16;

/// A note awaiting a stem-direction decision that could not be made locally
/// (the `Defer` policy applies exactly on the centre line and the engine
/// must look at the next resolved note to break the tie).
#[derive(Debug, Clone, Copy)]
struct PendingStem {
    item: ItemIndex,
}

/// Resolves stem directions for a stave one note/chord at a time, keeping
/// the small amount of state (previous direction, deferred notes) the
/// priority cascade needs across calls.
#[derive(Debug, Default)]
pub struct StemResolver {
    previous: Option<StemDirection>,
    pending: Vec<PendingStem>,
}

impl StemResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the stem direction for the chord/note starting at `head`,
    /// given the extreme (furthest-from-centre) member pitch `extreme_pitch`
    /// and the swap policy in effect for notes exactly on the centre line.
    pub fn post_note(
        &mut self,
        bar: &mut Bar,
        head: ItemIndex,
        extreme_pitch: StavePitch,
        policy: StemSwapPolicy,
    ) -> StemDirection {
        let note = bar.get(head).kind.as_note().expect("post_note on non-note item");

        // Priority 1: explicit coupling to a named voice's stem direction.
        let direction = if note.flags.coupled_up {
            Some(StemDirection::Up)
        } else if note.flags.coupled_down {
            Some(StemDirection::Down)
        } else {
            None
        };

        let direction = direction.unwrap_or_else(|| {
            let delta = extreme_pitch.value() - STAVE_CENTER;
            if delta == 0 {
                // Priority 2: exactly on the centre line — apply the
                // movement's stem-swap policy.
                match policy {
                    StemSwapPolicy::Up => StemDirection::Up,
                    StemSwapPolicy::Down => StemDirection::Down,
                    StemSwapPolicy::FollowPrevious => {
                        self.previous.unwrap_or(StemDirection::Down)
                    }
                    StemSwapPolicy::Defer => {
                        self.pending.push(PendingStem { item: head });
                        // Best-effort default until resolved retroactively;
                        // `resolve_deferred` overwrites this once the next
                        // unambiguous note is seen.
                        self.previous.unwrap_or(StemDirection::Down)
                    }
                }
            } else if delta < 0 {
                // Priority 3: below centre — stem up.
                StemDirection::Up
            } else {
                // Priority 3: above centre — stem down.
                StemDirection::Down
            }
        });

        if let Some(note) = bar.get_mut(head).kind.as_note_mut() {
            note.flags.stem_up = matches!(direction, StemDirection::Up);
        }
        self.resolve_deferred(bar, direction);
        self.previous = Some(direction);
        direction
    }

    /// Priority 4 tie-break: a deferred centre-line note takes the
    /// direction of the next unambiguous note, mirroring the original
    /// notation's backward-look for lines that sit exactly on the boundary.
    fn resolve_deferred(&mut self, bar: &mut Bar, resolved: StemDirection) {
        for pending in self.pending.drain(..) {
            if let Some(note) = bar.get_mut(pending.item).kind.as_note_mut() {
                note.flags.stem_up = matches!(resolved, StemDirection::Up);
            }
        }
    }
}

/// Unify stem direction across one beamed group: every note in the group
/// takes the direction dictated by whichever member pitch is furthest from
/// [`STAVE_CENTER`], since a single beam cannot bend to honour per-note
/// stem choices.
pub fn setbeamstems(bar: &mut Bar, group: &[ItemIndex]) {
    if group.is_empty() {
        return;
    }
    let extreme = group
        .iter()
        .filter_map(|&idx| bar.get(idx).kind.as_note().map(|n| (idx, n.stave_pitch.value())))
        .max_by_key(|&(_, pitch)| (pitch - STAVE_CENTER).abs());

    let Some((_, extreme_pitch)) = extreme else {
        return;
    };
    let direction = if extreme_pitch - STAVE_CENTER <= 0 {
        StemDirection::Up
    } else {
        StemDirection::Down
    };

    for &idx in group {
        if let Some(note) = bar.get_mut(idx).kind.as_note_mut() {
            note.flags.stem_up = matches!(direction, StemDirection::Up);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::item::{ItemKind, Note, NoteheadStyle};
    use crate::domain::value_objects::{AbsPitch, Accidental, NoteType, Tick};

    fn note_at(pitch: i32) -> ItemKind {
        ItemKind::Note(Note {
            note_type: NoteType::Crotchet,
            length: Tick::new(100),
            dots: 0,
            abs_pitch: AbsPitch::new(AbsPitch::MIDDLE_C),
            stave_pitch: StavePitch::new(pitch),
            accidental: Accidental::None,
            accidental_left_offset: 0,
            flags: Default::default(),
            accents: Default::default(),
            notehead: NoteheadStyle::Normal,
            masquerade: None,
        })
    }

    #[test]
    fn note_below_centre_stems_up() {
        let mut bar = Bar::new();
        let idx = bar.push_back(note_at(STAVE_CENTER - 20));
        let mut resolver = StemResolver::new();
        let dir = resolver.post_note(&mut bar, idx, StavePitch::new(STAVE_CENTER - 20), StemSwapPolicy::FollowPrevious);
        assert_eq!(dir, StemDirection::Up);
        assert!(bar.get(idx).kind.as_note().unwrap().flags.stem_up);
    }

    #[test]
    fn note_above_centre_stems_down() {
        let mut bar = Bar::new();
        let idx = bar.push_back(note_at(STAVE_CENTER + 20));
        let mut resolver = StemResolver::new();
        let dir = resolver.post_note(&mut bar, idx, StavePitch::new(STAVE_CENTER + 20), StemSwapPolicy::FollowPrevious);
        assert_eq!(dir, StemDirection::Down);
    }

    #[test]
    fn centre_line_follows_previous_under_default_policy() {
        let mut bar = Bar::new();
        let a = bar.push_back(note_at(STAVE_CENTER - 20));
        let b = bar.push_back(note_at(STAVE_CENTER));
        let mut resolver = StemResolver::new();
        resolver.post_note(&mut bar, a, StavePitch::new(STAVE_CENTER - 20), StemSwapPolicy::FollowPrevious);
        let dir = resolver.post_note(&mut bar, b, StavePitch::new(STAVE_CENTER), StemSwapPolicy::FollowPrevious);
        assert_eq!(dir, StemDirection::Up);
    }

    #[test]
    fn setbeamstems_unifies_direction_by_extreme_member() {
        let mut bar = Bar::new();
        let a = bar.push_back(note_at(STAVE_CENTER - 4));
        let b = bar.push_back(note_at(STAVE_CENTER + 40));
        setbeamstems(&mut bar, &[a, b]);
        assert!(!bar.get(a).kind.as_note().unwrap().flags.stem_up);
        assert!(!bar.get(b).kind.as_note().unwrap().flags.stem_up);
    }
}

//! Tie, slur and glissando geometry (§4.6).
//!
//! A short tie (between two notes in the same or adjacent positions) is
//! classified into one of eight cases by the stave-pitch relationship and
//! stem directions of its two notes, which decides which side of each
//! notehead the curve springs from. A chord tie additionally classifies
//! each member note as "outside" (springs from the chord's outer contour)
//! or "inside" (springs from directly above/below the notehead, since an
//! outer-contour curve would cross through another chord member). A tie
//! that crosses a system break has no second endpoint to curve toward, so
//! it is drawn in a continuation style instead.

use crate::domain::value_objects::StemDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieCase {
    /// Same pitch, both stems up: curve springs below both noteheads.
    SamePitchStemsUp,
    /// Same pitch, both stems down: curve springs above both noteheads.
    SamePitchStemsDown,
    /// Same pitch, opposing stems: curve follows the stemless side.
    SamePitchMixedStems,
    /// Rising pitch, both stems up.
    RisingStemsUp,
    /// Rising pitch, both stems down.
    RisingStemsDown,
    /// Falling pitch, both stems up.
    FallingStemsUp,
    /// Falling pitch, both stems down.
    FallingStemsDown,
    /// Rising or falling pitch with opposing stems.
    MixedPitchMixedStems,
}

pub fn classify_short_tie(
    from_pitch: i32,
    to_pitch: i32,
    from_stem: StemDirection,
    to_stem: StemDirection,
) -> TieCase {
    use StemDirection::*;
    use TieCase::*;
    match (from_pitch.cmp(&to_pitch), from_stem, to_stem) {
        (std::cmp::Ordering::Equal, Up, Up) => SamePitchStemsUp,
        (std::cmp::Ordering::Equal, Down, Down) => SamePitchStemsDown,
        (std::cmp::Ordering::Equal, _, _) => SamePitchMixedStems,
        (std::cmp::Ordering::Less, Up, Up) => RisingStemsUp,
        (std::cmp::Ordering::Less, Down, Down) => RisingStemsDown,
        (std::cmp::Ordering::Greater, Up, Up) => FallingStemsUp,
        (std::cmp::Ordering::Greater, Down, Down) => FallingStemsDown,
        _ => MixedPitchMixedStems,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordTiePlacement {
    /// Springs from the outer contour of the chord (topmost or bottommost
    /// member, on the side away from the other members).
    Outside,
    /// Springs straight up/down from the notehead, since an outer-contour
    /// curve would cross through a neighbouring chord member.
    Inside,
}

/// Classify every member of a chord, in the chain order produced by
/// [`crate::domain::engrave::chord::layout_chord`] (ascending pitch for a
/// stem-down chord, descending for stem-up), as `Outside` (the extreme
/// members) or `Inside` (everything between them).
pub fn classify_chord_tie_placements(member_count: usize) -> Vec<ChordTiePlacement> {
    (0..member_count)
        .map(|i| {
            if i == 0 || i == member_count - 1 {
                ChordTiePlacement::Outside
            } else {
                ChordTiePlacement::Inside
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuationStyle {
    /// This system ends with a tie/slur that continues onto the next
    /// system: draw only the approach curve, open at the system's edge.
    OpensAtSystemEnd,
    /// This system begins with the continuation of a tie/slur from the
    /// previous system: draw only the departure curve, open at the
    /// system's edge.
    ClosesAtSystemStart,
}

/// A tie/slur whose two notes fall in different systems has no far
/// endpoint to curve toward on either side; it prints as two half-curves,
/// one per system.
pub fn continuation_style_for_system_break(first_note_is_in_earlier_system: bool) -> ContinuationStyle {
    if first_note_is_in_earlier_system {
        ContinuationStyle::OpensAtSystemEnd
    } else {
        ContinuationStyle::ClosesAtSystemStart
    }
}

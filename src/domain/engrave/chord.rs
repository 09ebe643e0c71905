//! Chord sort and accidental layout (§4.3).
//!
//! A chord is a run of one [`ItemKind::Note`] followed by zero or more
//! [`ItemKind::ChordContinuation`] items in the same bar chain. Printing a
//! chord correctly needs four passes over that run:
//!
//! 1. insertion-sort the notes by stave pitch (chords are entered in
//!    whatever order the reader saw them; printing wants low-to-high),
//! 2. detect "seconds" — adjacent notes one stave-step apart — and flag the
//!    upper one to invert its notehead to the opposite side of the stem so
//!    the two heads don't overlap,
//! 3. pack accidentals leftward from the notehead column, tucking a small
//!    accidental into the gap beside a larger one when they don't clash,
//!    and otherwise stepping further left,
//! 4. re-thread the bar's item chain so chain order matches sorted order
//!    (downstream passes, e.g. the position table, assume a chord's items
//!    are link-adjacent and pitch-ordered).

use crate::domain::bar::Bar;
use crate::domain::ids::ItemIndex;
use crate::domain::item::{ItemKind, Note};
use crate::domain::value_objects::StemDirection;

/// Horizontal half-steps (in the same units as `accidental_left_offset`)
/// one accidental "column" occupies before the next one may be tucked in.
const ACCIDENTAL_COLUMN_WIDTH: i32 = 9;

/// Stave-pitch distance (in [`crate::domain::value_objects::StavePitch`]
/// units) below which two adjacent notes are a "second" and must be offset
/// to opposite sides of the stem.
const SECOND_THRESHOLD: i32 = 4;

/// Collect the indices of one chord's member items, in current chain order,
/// starting at `head` (which must point at an `ItemKind::Note`).
pub fn chord_members(bar: &Bar, head: ItemIndex) -> Vec<ItemIndex> {
    let mut members = vec![head];
    let mut cur = bar.get(head).next;
    while let Some(idx) = cur {
        if matches!(bar.get(idx).kind, ItemKind::ChordContinuation(_)) {
            members.push(idx);
            cur = bar.get(idx).next;
        } else {
            break;
        }
    }
    members
}

/// Step 1: sort chord member indices by ascending stave pitch. Returns the
/// permutation as a new index ordering; does not mutate the bar.
fn sorted_by_pitch(bar: &Bar, members: &[ItemIndex]) -> Vec<ItemIndex> {
    let mut sorted = members.to_vec();
    // Insertion sort: chords are small (rarely more than a handful of
    // notes), and insertion sort is stable, which matters when two notes
    // share a pitch (unison) and must keep reader order.
    for i in 1..sorted.len() {
        let mut j = i;
        while j > 0
            && bar.get(sorted[j - 1]).kind.as_note().unwrap().stave_pitch.value()
                > bar.get(sorted[j]).kind.as_note().unwrap().stave_pitch.value()
        {
            sorted.swap(j - 1, j);
            j -= 1;
        }
    }
    sorted
}

/// Step 2: flag adjacent notes closer than [`SECOND_THRESHOLD`] apart so one
/// of the pair inverts its notehead.
fn flag_seconds(bar: &mut Bar, sorted: &[ItemIndex]) {
    for pair in sorted.windows(2) {
        let (lower, upper) = (pair[0], pair[1]);
        let lower_pitch = bar.get(lower).kind.as_note().unwrap().stave_pitch.value();
        let upper_pitch = bar.get(upper).kind.as_note().unwrap().stave_pitch.value();
        if upper_pitch - lower_pitch < SECOND_THRESHOLD {
            // The upper note of the pair moves to the other side of the
            // stem; the lower note stays on the normal side.
            if let Some(note) = bar.get_mut(upper).kind.as_note_mut() {
                note.flags.invert_head = true;
            }
        }
    }
}

/// Step 3: pack accidentals leftward, tucking a later accidental in next to
/// an earlier one when their vertical spans don't overlap closely enough to
/// clash, stepping one more column left otherwise.
fn pack_accidentals(bar: &mut Bar, sorted: &[ItemIndex]) {
    // Walk high-to-low: accidentals are packed starting from the note
    // furthest from the "anchor" column and tucked inward when room allows.
    let mut placed: Vec<(i32, i32)> = Vec::new(); // (stave_pitch, column_offset)
    for &idx in sorted.iter().rev() {
        let Some(note) = bar.get(idx).kind.as_note().cloned() else {
            continue;
        };
        if matches!(note.accidental, crate::domain::value_objects::Accidental::None) {
            continue;
        }
        let pitch = note.stave_pitch.value();
        // Find the innermost (least negative) column that doesn't clash
        // with any accidental already placed within the threatening range.
        let mut column = -1i32;
        loop {
            let offset = column * ACCIDENTAL_COLUMN_WIDTH;
            let clashes = placed.iter().any(|&(other_pitch, other_offset)| {
                other_offset == offset && (other_pitch - pitch).abs() < SECOND_THRESHOLD * 3
            });
            if !clashes {
                break;
            }
            column -= 1;
        }
        let offset = column * ACCIDENTAL_COLUMN_WIDTH;
        placed.push((pitch, offset));
        if let Some(note) = bar.get_mut(idx).kind.as_note_mut() {
            note.accidental_left_offset = offset;
        }
    }
}

/// Step 4: re-thread the bar's item chain so the member items appear in
/// `sorted` order, converting every member but the first to
/// `ChordContinuation` (and the first to plain `Note`) as required by the
/// §3 chord-encoding invariant.
fn rethread(bar: &mut Bar, members: &[ItemIndex], sorted: &[ItemIndex]) {
    if members == sorted {
        retag(bar, sorted);
        return;
    }
    let before = bar.get(members[0]).prev;
    let after = bar.get(*members.last().unwrap()).next;

    for window in sorted.windows(2) {
        let (a, b) = (window[0], window[1]);
        bar.get_mut(a).next = Some(b);
        bar.get_mut(b).prev = Some(a);
    }
    bar.get_mut(sorted[0]).prev = before;
    bar.get_mut(*sorted.last().unwrap()).next = after;

    retag(bar, sorted);
}

fn retag(bar: &mut Bar, sorted: &[ItemIndex]) {
    for (i, &idx) in sorted.iter().enumerate() {
        let note = take_note(bar, idx);
        bar.get_mut(idx).kind = if i == 0 {
            ItemKind::Note(note)
        } else {
            ItemKind::ChordContinuation(note)
        };
    }
}

fn take_note(bar: &Bar, idx: ItemIndex) -> Note {
    bar.get(idx).kind.as_note().expect("chord member must be a note").clone()
}

/// Run the full four-pass chord layout starting at `head`, given the chord's
/// resolved stem direction. Returns the new head index of the chord run (the
/// chain may have been re-threaded).
///
/// Seconds-flagging and accidental packing always walk low-to-high, since
/// both depend on vertical adjacency rather than stem side. The final
/// chain order does not: a stem-up chord threads high-to-low, a stem-down
/// chord low-to-high.
pub fn layout_chord(bar: &mut Bar, head: ItemIndex, stem: StemDirection) -> ItemIndex {
    let members = chord_members(bar, head);
    if members.len() < 2 {
        return head;
    }
    let mut sorted = sorted_by_pitch(bar, &members);
    flag_seconds(bar, &sorted);
    pack_accidentals(bar, &sorted);
    if stem == StemDirection::Up {
        sorted.reverse();
    }
    rethread(bar, &members, &sorted);
    sorted[0]
}

//! Bar aggregate: a head-node/item-chain structure terminated by a barline
//! (§3 invariant: "every bar ends with exactly one barline item, except the
//! final bar of a movement which may omit it").

use super::errors::{Diagnostics, Severity};
use super::ids::ItemIndex;
use super::item::{Item, ItemKind};
use serde::{Deserialize, Serialize};

/// How many times a repeated bar is to be played back (§3, §6 `[midi_repeats]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatCount(pub u16);

impl Default for RepeatCount {
    fn default() -> Self {
        RepeatCount(1)
    }
}

/// One bar: a doubly linked chain of [`Item`]s plus bar-level bookkeeping.
///
/// Items are stored in a flat `Vec` and linked via `prev`/`next` indices
/// rather than a cyclic pointer list, so insertion/removal only touches the
/// two neighbouring link fields and never invalidates other indices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bar {
    items: Vec<Item>,
    head: Option<ItemIndex>,
    tail: Option<ItemIndex>,
    pub repeat_count: RepeatCount,
    /// Logical bar number override, if this bar was given one explicitly
    /// (e.g. following a pickup bar or a renumbering directive).
    pub number_override: Option<i32>,
}

impl Bar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut cur = self.head;
        while let Some(idx) = cur {
            count += 1;
            cur = self.items[idx.0].next;
        }
        count
    }

    pub fn get(&self, idx: ItemIndex) -> &Item {
        &self.items[idx.0]
    }

    pub fn get_mut(&mut self, idx: ItemIndex) -> &mut Item {
        &mut self.items[idx.0]
    }

    pub fn head(&self) -> Option<ItemIndex> {
        self.head
    }

    pub fn tail(&self) -> Option<ItemIndex> {
        self.tail
    }

    /// Append an item at the end of the chain, returning its stable index.
    pub fn push_back(&mut self, kind: ItemKind) -> ItemIndex {
        let idx = ItemIndex(self.items.len());
        let mut item = Item::new(kind);
        item.prev = self.tail;
        self.items.push(item);
        if let Some(tail) = self.tail {
            self.items[tail.0].next = Some(idx);
        } else {
            self.head = Some(idx);
        }
        self.tail = Some(idx);
        idx
    }

    /// Insert `kind` immediately after `after`, re-threading the chain in
    /// O(1) without shifting any other item's index.
    pub fn insert_after(&mut self, after: ItemIndex, kind: ItemKind) -> ItemIndex {
        let idx = ItemIndex(self.items.len());
        let next = self.items[after.0].next;
        let mut item = Item::new(kind);
        item.prev = Some(after);
        item.next = next;
        self.items.push(item);

        self.items[after.0].next = Some(idx);
        if let Some(next) = next {
            self.items[next.0].prev = Some(idx);
        } else {
            self.tail = Some(idx);
        }
        idx
    }

    /// Splice `idx` out of the chain. The underlying storage slot is kept
    /// (indices remain stable) but it is no longer reachable by traversal.
    pub fn unlink(&mut self, idx: ItemIndex) {
        let (prev, next) = {
            let item = &self.items[idx.0];
            (item.prev, item.next)
        };
        match prev {
            Some(p) => self.items[p.0].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.items[n.0].prev = prev,
            None => self.tail = prev,
        }
    }

    pub fn iter(&self) -> BarIter<'_> {
        BarIter {
            bar: self,
            cur: self.head,
        }
    }

    /// Total note/rest length accumulated in this bar, in ticks — used by
    /// the bar-length check (Testable Property 3).
    pub fn accumulated_length(&self) -> i64 {
        self.iter()
            .filter_map(|(_, item)| item.kind.as_note())
            .map(|n| n.length.value())
            .sum()
    }

    /// Verify this bar is barline-terminated, per the §3 structural
    /// invariant, reporting a diagnostic rather than panicking when it is
    /// not (the reader is responsible for appending a missing barline, but
    /// transforms that mutate the chain later must not silently violate it).
    pub fn check_terminated(&self, diagnostics: &mut Diagnostics, allow_open: bool) {
        if self.is_empty() {
            return;
        }
        let terminated = self.tail.map_or(false, |t| self.items[t.0].kind.is_barline());
        if !terminated && !allow_open {
            let _ = diagnostics.report(
                Severity::Minor,
                "BAR_NOT_TERMINATED",
                vec![],
                None,
                None,
            );
        }
    }
}

pub struct BarIter<'a> {
    bar: &'a Bar,
    cur: Option<ItemIndex>,
}

impl<'a> Iterator for BarIter<'a> {
    type Item = (ItemIndex, &'a Item);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cur?;
        let item = self.bar.get(idx);
        self.cur = item.next;
        Some((idx, item))
    }
}

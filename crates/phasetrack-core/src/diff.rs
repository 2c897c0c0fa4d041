//! Keyed list diffing for live-updating views.
//!
//! Rapid polling would otherwise repaint whole lists (step lines, stat pills,
//! the activity feed) on every tick. [`diff_keyed`] computes the minimal
//! sequence of patches that turns the previous list into the next one;
//! renderers apply them to whatever widgets they own.

use std::collections::HashSet;
use std::hash::Hash;

/// Items with a stable identity across renders.
pub trait Keyed {
    type Key: Eq + Hash + Clone + std::fmt::Debug;

    fn key(&self) -> Self::Key;
}

/// One edit to a rendered list. Patches apply in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch<T: Keyed> {
    /// Drop the item with this key.
    Remove { key: T::Key },
    /// Insert a new item at `index`.
    Insert { index: usize, item: T },
    /// Move an existing item to `index`.
    Move { key: T::Key, index: usize },
    /// Replace the content of an existing item in place.
    Update { item: T },
}

/// Compute patches turning `prev` into `next`.
///
/// Removals come first, then one left-to-right pass over `next` emits
/// inserts, moves, and updates. Keys are assumed unique within each list.
pub fn diff_keyed<T>(prev: &[T], next: &[T]) -> Vec<Patch<T>>
where
    T: Keyed + Clone + PartialEq,
{
    let mut patches = Vec::new();
    let next_keys: HashSet<T::Key> = next.iter().map(Keyed::key).collect();

    // Working copy of the list as patches are applied.
    let mut working: Vec<&T> = Vec::with_capacity(prev.len().max(next.len()));
    for item in prev {
        if next_keys.contains(&item.key()) {
            working.push(item);
        } else {
            patches.push(Patch::Remove { key: item.key() });
        }
    }

    for (index, item) in next.iter().enumerate() {
        let key = item.key();
        if working.get(index).is_some_and(|w| w.key() == key) {
            if working[index] != item {
                patches.push(Patch::Update { item: item.clone() });
                working[index] = item;
            }
            continue;
        }

        match working.iter().position(|w| w.key() == key) {
            Some(from) => {
                let old = working.remove(from);
                working.insert(index, item);
                patches.push(Patch::Move {
                    key: key.clone(),
                    index,
                });
                if old != item {
                    patches.push(Patch::Update { item: item.clone() });
                }
            }
            None => {
                working.insert(index, item);
                patches.push(Patch::Insert {
                    index,
                    item: item.clone(),
                });
            }
        }
    }

    patches
}

/// Apply patches to a list in place.
///
/// Patches referencing unknown keys are skipped.
pub fn apply_patches<T>(list: &mut Vec<T>, patches: &[Patch<T>])
where
    T: Keyed + Clone,
{
    for patch in patches {
        match patch {
            Patch::Remove { key } => list.retain(|i| &i.key() != key),
            Patch::Insert { index, item } => {
                let at = (*index).min(list.len());
                list.insert(at, item.clone());
            }
            Patch::Move { key, index } => {
                if let Some(from) = list.iter().position(|i| &i.key() == key) {
                    let item = list.remove(from);
                    let at = (*index).min(list.len());
                    list.insert(at, item);
                }
            }
            Patch::Update { item } => {
                let key = item.key();
                if let Some(slot) = list.iter_mut().find(|i| i.key() == key) {
                    *slot = item.clone();
                }
            }
        }
    }
}

//! Aggregation maps: `Map<Int, V>` values handed to a query by the host.

use indexmap::IndexMap;

/// Entry shape of one `Map<Int, V>` instantiation, emitted as read-only data
/// by the compiler and passed to every `get`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryLayout {
    /// Number of 8-byte slots in an entry.
    pub slots: i64,
    /// Slot holding the key property.
    pub key_slot: i64,
}

/// Keyed entries created on first access, kept in insertion order.
///
/// Entries are boxed so the pointers handed to compiled code stay valid
/// while the map grows.
#[derive(Debug, Default)]
pub struct AggregateMap {
    entries: IndexMap<i64, Box<[i64]>>,
}

impl AggregateMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The entry for `key`, created zero-filled with its key slot set when absent.
    pub fn get_or_insert(&mut self, key: i64, layout: EntryLayout) -> &mut [i64] {
        self.entries.entry(key).or_insert_with(|| {
            let mut entry = vec![0; layout.slots.max(0) as usize].into_boxed_slice();
            if let Some(slot) = usize::try_from(layout.key_slot).ok().and_then(|i| entry.get_mut(i)) {
                *slot = key;
            }
            entry
        })
    }

    pub fn get(&self, key: i64) -> Option<&[i64]> {
        self.entries.get(&key).map(|entry| &entry[..])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = i64> + '_ {
        self.entries.keys().copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = (i64, &[i64])> {
        self.entries.iter().map(|(&key, entry)| (key, &entry[..]))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

//! Client-local cache of the canonical playlist.
//!
//! Replaced wholesale on every resync; never patched.  `current` is `None`
//! exactly when `items` is empty.

use piplayer_proto::item::PlaylistItem;

use crate::error::PlaybackError;

#[derive(Debug, Default)]
pub struct PlaylistStore {
    items: Vec<PlaylistItem>,
    current: Option<usize>,
}

impl PlaylistStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[PlaylistItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn get(&self, index: usize) -> Option<&PlaylistItem> {
        self.items.get(index)
    }

    pub fn current_item(&self) -> Option<&PlaylistItem> {
        self.current.and_then(|i| self.items.get(i))
    }

    /// Swap in a fresh snapshot.  The current index survives when it is still
    /// in range, otherwise it falls back to the first item.
    pub fn replace(&mut self, items: Vec<PlaylistItem>) {
        self.current = match self.current {
            _ if items.is_empty() => None,
            Some(i) if i < items.len() => Some(i),
            _ => Some(0),
        };
        self.items = items;
    }

    /// Range-check a raw index coming off the wire.
    pub fn checked_index(&self, index: i64) -> Result<usize, PlaybackError> {
        usize::try_from(index)
            .ok()
            .filter(|i| *i < self.items.len())
            .ok_or(PlaybackError::IndexOutOfRange {
                index,
                len: self.items.len(),
            })
    }

    /// Returns whether the index actually changed.  Re-applying the same
    /// index is a no-op.
    pub fn set_current(&mut self, index: usize) -> Result<bool, PlaybackError> {
        if index >= self.items.len() {
            return Err(PlaybackError::IndexOutOfRange {
                index: index as i64,
                len: self.items.len(),
            });
        }
        let changed = self.current != Some(index);
        self.current = Some(index);
        Ok(changed)
    }

    /// Index after `from`, wrapping `len-1 → 0`.
    pub fn wrap_next(&self, from: Option<usize>) -> Result<usize, PlaybackError> {
        let len = self.non_empty_len()?;
        Ok(match from {
            Some(i) => (i + 1) % len,
            None => 0,
        })
    }

    /// Index before `from`, wrapping `0 → len-1`.
    pub fn wrap_previous(&self, from: Option<usize>) -> Result<usize, PlaybackError> {
        let len = self.non_empty_len()?;
        Ok(match from {
            Some(i) if i > 0 && i < len => i - 1,
            _ => len - 1,
        })
    }

    fn non_empty_len(&self) -> Result<usize, PlaybackError> {
        match self.items.len() {
            0 => Err(PlaybackError::EmptyPlaylist),
            n => Ok(n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(n: usize) -> PlaylistStore {
        let mut store = PlaylistStore::new();
        store.replace((0..n).map(|i| PlaylistItem::new(format!("{}.jpg", i))).collect());
        store
    }

    #[test]
    fn test_empty_store_has_no_current() {
        let store = PlaylistStore::new();
        assert_eq!(store.current(), None);
        assert_eq!(store.wrap_next(None), Err(PlaybackError::EmptyPlaylist));
    }

    #[test]
    fn test_wraparound_for_every_length() {
        for n in 1..=6 {
            let store = store(n);
            assert_eq!(store.wrap_next(Some(n - 1)), Ok(0), "n={}", n);
            assert_eq!(store.wrap_previous(Some(0)), Ok(n - 1), "n={}", n);
            for i in 0..n {
                let next = store.wrap_next(Some(i)).unwrap();
                assert_eq!(store.wrap_previous(Some(next)), Ok(i));
            }
        }
    }

    #[test]
    fn test_replace_is_wholesale() {
        let mut store = store(3);
        store.set_current(2).unwrap();
        store.replace(vec![PlaylistItem::new("x.mp4")]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.items()[0].visual, "x.mp4");
        assert_eq!(store.current(), Some(0));

        store.replace(Vec::new());
        assert_eq!(store.current(), None);
    }

    #[test]
    fn test_replace_keeps_current_in_range() {
        let mut store = store(4);
        store.set_current(2).unwrap();
        store.replace((0..5).map(|i| PlaylistItem::new(format!("{}.png", i))).collect());
        assert_eq!(store.current(), Some(2));
    }

    #[test]
    fn test_out_of_range_leaves_current() {
        let mut store = store(2);
        store.set_current(1).unwrap();
        assert!(store.set_current(2).is_err());
        assert_eq!(store.checked_index(-1), Err(PlaybackError::IndexOutOfRange { index: -1, len: 2 }));
        assert_eq!(store.current(), Some(1));
    }

    #[test]
    fn test_set_same_index_is_noop() {
        let mut store = store(2);
        assert_eq!(store.set_current(1), Ok(true));
        assert_eq!(store.set_current(1), Ok(false));
    }
}

use alloc::vec::Vec;

use crate::ExceptionContext;
use crate::RowGeometry;
use crate::key::{KeyCacheKey, KeyIndexMap};

/// Lazily filled position cache over an [`ExceptionContext`] and a row → key mapping.
///
/// Positions are filled forward only. [`Self::pos_by_key`] either hits the cache or keeps
/// filling until the key shows up (or the rows run out), so repeated and roughly sequential
/// lookups are amortized `O(1)`.
///
/// When the same key appears on several rows, the first row wins.
pub struct KeyFinder<'a, K, F> {
    context: &'a ExceptionContext,
    key: F,
    positions: Vec<RowGeometry>,
    by_key: KeyIndexMap<K>,
}

impl<'a, K, F> KeyFinder<'a, K, F>
where
    K: KeyCacheKey + Clone,
    F: Fn(usize) -> K,
{
    pub fn new(context: &'a ExceptionContext, key: F) -> Self {
        Self {
            context,
            key,
            positions: Vec::new(),
            by_key: KeyIndexMap::<K>::new(),
        }
    }

    pub fn context(&self) -> &'a ExceptionContext {
        self.context
    }

    /// Number of rows whose position is cached.
    pub fn filled(&self) -> usize {
        self.positions.len()
    }

    pub fn key_of(&self, index: usize) -> K {
        (self.key)(index)
    }

    pub fn pos_by_index(&mut self, index: usize) -> Option<RowGeometry> {
        if index >= self.context.number_of_rows() {
            return None;
        }
        while self.positions.len() <= index {
            self.fill_next();
        }
        Some(self.positions[index])
    }

    pub fn pos_by_key(&mut self, key: &K) -> Option<RowGeometry> {
        let index = self.index_of(key)?;
        Some(self.positions[index])
    }

    pub fn index_of(&mut self, key: &K) -> Option<usize> {
        if let Some(&index) = self.by_key.get(key) {
            return Some(index);
        }
        while self.positions.len() < self.context.number_of_rows() {
            let (index, found) = self.fill_next();
            if found == *key {
                return Some(index);
            }
        }
        None
    }

    pub fn contains_key(&mut self, key: &K) -> bool {
        self.index_of(key).is_some()
    }

    pub fn height_of(&self, index: usize) -> u32 {
        self.context.row_height(index)
    }

    pub fn exception_height_of(&self, index: usize) -> Option<u32> {
        self.context.exception_height(index)
    }

    pub fn padding(&self, index: Option<usize>) -> u32 {
        self.context.padding(index)
    }

    fn fill_next(&mut self) -> (usize, K) {
        let index = self.positions.len();
        let y = self.positions.last().map_or(0, RowGeometry::end);
        self.positions.push(RowGeometry {
            index,
            y,
            height: self.context.row_height(index),
        });
        let key = (self.key)(index);
        self.by_key.entry(key.clone()).or_insert(index);
        (index, key)
    }
}

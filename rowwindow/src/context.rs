use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use crate::key::HeightLookup;
use crate::range::{index_at_offset_in, resolve_range, row_top_in};
use crate::{HeightException, RowGeometry, VisibleRange};

/// Row height used when a height sequence has no usable most-frequent value.
pub const FALLBACK_ROW_HEIGHT: u32 = 20;

/// Extra spacing folded into every row height.
///
/// `at(None)` is the universal padding constant; `at(Some(i))` is the padding of row `i`,
/// which defaults to the universal value unless a per-row function is installed.
#[derive(Clone, Default)]
pub struct Padding {
    universal: u32,
    per_row: Option<Arc<dyn Fn(usize) -> u32 + Send + Sync>>,
}

impl Padding {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn uniform(padding: u32) -> Self {
        Self {
            universal: padding,
            per_row: None,
        }
    }

    pub fn per_row(universal: u32, f: impl Fn(usize) -> u32 + Send + Sync + 'static) -> Self {
        Self {
            universal,
            per_row: Some(Arc::new(f)),
        }
    }

    pub fn at(&self, index: Option<usize>) -> u32 {
        match (index, &self.per_row) {
            (Some(i), Some(f)) => f(i),
            _ => self.universal,
        }
    }
}

impl fmt::Debug for Padding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Padding")
            .field("universal", &self.universal)
            .field("per_row", &self.per_row.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Immutable geometry snapshot of a row set: a default row height plus a sparse, sorted list
/// of rows whose height differs from it.
///
/// Rebuild a context whenever the row set changes; the render layer only ever reads it.
#[derive(Clone, Debug)]
pub struct ExceptionContext {
    number_of_rows: usize,
    default_row_height: u32,
    exceptions: Vec<HeightException>,
    lookup: HeightLookup,
    total_height: u64,
    padding: Padding,
}

impl ExceptionContext {
    /// Every row is `row_height` plus the universal padding tall.
    pub fn uniform(number_of_rows: usize, row_height: u32, padding: Padding) -> Self {
        let default_row_height = row_height.saturating_add(padding.at(None));
        debug_assert!(default_row_height > 0, "default row height must be > 0");
        vdebug!(number_of_rows, default_row_height, "ExceptionContext::uniform");
        Self {
            number_of_rows,
            default_row_height,
            exceptions: Vec::new(),
            lookup: HeightLookup::new(),
            total_height: number_of_rows as u64 * default_row_height as u64,
            padding,
        }
    }

    /// Builds a context from raw (unpadded) row heights.
    ///
    /// `default_row_height` is a raw height as well and gets the universal padding added.
    /// Without it, the most frequent padded height becomes the default (ties go to the smaller
    /// height; a most-frequent height of 0 falls back to the runner-up, then to
    /// [`FALLBACK_ROW_HEIGHT`]).
    pub fn from_heights(
        heights: &[u32],
        default_row_height: Option<u32>,
        padding: Padding,
    ) -> Self {
        let default_row_height = match default_row_height {
            Some(h) => h.saturating_add(padding.at(None)),
            None => most_frequent_height(
                heights
                    .iter()
                    .enumerate()
                    .map(|(i, &h)| h.saturating_add(padding.at(Some(i)))),
            ),
        };
        debug_assert!(default_row_height > 0, "default row height must be > 0");

        let mut exceptions: Vec<HeightException> = Vec::new();
        let mut lookup = HeightLookup::new();
        let mut total_height = 0u64;
        let step = default_row_height as u64;

        for (index, &raw) in heights.iter().enumerate() {
            let height = raw.saturating_add(padding.at(Some(index)));
            total_height = total_height.saturating_add(height as u64);
            if height == default_row_height {
                continue;
            }
            let y = match exceptions.last() {
                Some(prev) => prev
                    .y2()
                    .saturating_add((index - prev.index - 1) as u64 * step),
                None => index as u64 * step,
            };
            exceptions.push(HeightException { index, y, height });
            lookup.insert(index, height);
        }

        vdebug!(
            number_of_rows = heights.len(),
            default_row_height,
            exceptions = exceptions.len(),
            total_height,
            "ExceptionContext::from_heights"
        );

        Self {
            number_of_rows: heights.len(),
            default_row_height,
            exceptions,
            lookup,
            total_height,
            padding,
        }
    }

    /// Builds a context from `(index, padded height)` overrides.
    ///
    /// Indexes must be strictly increasing and below `number_of_rows`. Violations trip a debug
    /// assertion; release builds skip the offending entries.
    pub fn from_exceptions(
        number_of_rows: usize,
        default_row_height: u32,
        overrides: impl IntoIterator<Item = (usize, u32)>,
        padding: Padding,
    ) -> Self {
        debug_assert!(default_row_height > 0, "default row height must be > 0");
        let step = default_row_height as u64;
        let mut exceptions: Vec<HeightException> = Vec::new();
        let mut lookup = HeightLookup::new();
        let mut override_sum = 0u64;

        for (index, height) in overrides {
            let in_order = exceptions.last().is_none_or(|prev| index > prev.index);
            if index >= number_of_rows || !in_order {
                vwarn!(index, number_of_rows, "from_exceptions: invalid exception index");
                debug_assert!(
                    index < number_of_rows && in_order,
                    "exceptions must be in-bounds and strictly increasing (index={index})"
                );
                continue;
            }
            if height == default_row_height {
                continue;
            }
            let y = match exceptions.last() {
                Some(prev) => prev
                    .y2()
                    .saturating_add((index - prev.index - 1) as u64 * step),
                None => index as u64 * step,
            };
            exceptions.push(HeightException { index, y, height });
            lookup.insert(index, height);
            override_sum = override_sum.saturating_add(height as u64);
        }

        let uniform_rows = (number_of_rows - exceptions.len()) as u64;
        Self {
            number_of_rows,
            default_row_height,
            total_height: uniform_rows * step + override_sum,
            exceptions,
            lookup,
            padding,
        }
    }

    pub fn number_of_rows(&self) -> usize {
        self.number_of_rows
    }

    pub fn is_empty(&self) -> bool {
        self.number_of_rows == 0
    }

    pub fn default_row_height(&self) -> u32 {
        self.default_row_height
    }

    pub fn exceptions(&self) -> &[HeightException] {
        &self.exceptions
    }

    pub fn exceptions_lookup(&self) -> &HeightLookup {
        &self.lookup
    }

    pub fn total_height(&self) -> u64 {
        self.total_height
    }

    /// Padding of row `index`, or the universal padding for `None`.
    pub fn padding(&self, index: Option<usize>) -> u32 {
        self.padding.at(index)
    }

    pub fn exception_height(&self, index: usize) -> Option<u32> {
        self.lookup.get(&index).copied()
    }

    pub fn row_height(&self, index: usize) -> u32 {
        self.exception_height(index)
            .unwrap_or(self.default_row_height)
    }

    /// Top offset of row `index`. `row_top(number_of_rows)` is the total height.
    pub fn row_top(&self, index: usize) -> u64 {
        row_top_in(index, self.default_row_height, &self.exceptions)
    }

    pub fn row_geometry(&self, index: usize) -> RowGeometry {
        RowGeometry {
            index,
            y: self.row_top(index),
            height: self.row_height(index),
        }
    }

    /// Index of the row covering `offset`, clamped to the last row.
    pub fn index_at_offset(&self, offset: u64) -> Option<usize> {
        index_at_offset_in(
            offset,
            self.default_row_height,
            &self.exceptions,
            self.number_of_rows,
        )
    }

    /// Shorthand for [`resolve_range`] over this context.
    pub fn resolve_range(&self, scroll_offset: u64, viewport_size: u32) -> VisibleRange {
        resolve_range(
            scroll_offset,
            viewport_size,
            self.default_row_height,
            &self.exceptions,
            self.number_of_rows,
        )
    }
}

fn most_frequent_height(heights: impl Iterator<Item = u32>) -> u32 {
    let mut counts = BTreeMap::<u32, usize>::new();
    for h in heights {
        *counts.entry(h).or_insert(0) += 1;
    }

    // BTreeMap iterates ascending, so strict `>` keeps the smaller height on ties.
    let mut best: Option<(u32, usize)> = None;
    let mut best_nonzero: Option<(u32, usize)> = None;
    for (&h, &n) in &counts {
        if best.is_none_or(|(_, c)| n > c) {
            best = Some((h, n));
        }
        if h > 0 && best_nonzero.is_none_or(|(_, c)| n > c) {
            best_nonzero = Some((h, n));
        }
    }

    match best {
        Some((h, _)) if h > 0 => h,
        _ => best_nonzero.map_or(FALLBACK_ROW_HEIGHT, |(h, _)| h),
    }
}

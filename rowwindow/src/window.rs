use core::ops::Range;

use crate::VisibleRange;

/// The materialized row window plus the exact window last required by the viewport.
///
/// `start..end` may be wider than `forced_start..forced_end` (batch slack, prefetch), and both
/// lie within `0..number_of_rows` whenever non-empty.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VisibleWindow {
    pub start: usize,
    pub end: usize,
    pub forced_start: usize,
    pub forced_end: usize,
}

impl VisibleWindow {
    pub const EMPTY: Self = Self {
        start: 0,
        end: 0,
        forced_start: 0,
        forced_end: 0,
    };

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn forced(&self) -> Range<usize> {
        self.forced_start..self.forced_end
    }
}

/// How a scroll reaction changed the materialized window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScrollResult {
    /// The window already covered the viewport.
    None,
    /// The window was rebuilt from scratch.
    All,
    /// Rows were added at the top (scrolling backward).
    SomeTop,
    /// Rows were added at the bottom (scrolling forward).
    SomeBottom,
}

impl ScrollResult {
    pub fn is_none(self) -> bool {
        matches!(self, Self::None)
    }

    pub fn is_some(self) -> bool {
        matches!(self, Self::SomeTop | Self::SomeBottom)
    }

    pub fn is_all(self) -> bool {
        matches!(self, Self::All)
    }
}

/// Boundary edits that move one window to the next.
///
/// Apply `clear` first, then the removals, then `add_top` and `add_bottom` in index order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WindowPatch {
    pub clear: bool,
    pub remove_top: Range<usize>,
    pub remove_bottom: Range<usize>,
    pub add_top: Range<usize>,
    pub add_bottom: Range<usize>,
}

impl WindowPatch {
    pub fn is_noop(&self) -> bool {
        !self.clear
            && self.remove_top.is_empty()
            && self.remove_bottom.is_empty()
            && self.add_top.is_empty()
            && self.add_bottom.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScrollPlan {
    pub result: ScrollResult,
    pub patch: WindowPatch,
    /// The window after applying `patch`.
    pub window: VisibleWindow,
}

/// Diffs the current window against a freshly resolved range.
///
/// Small deltas are smoothed by `batch_size`: a boundary that needs fewer than `batch_size` new
/// rows grows by `batch_size` rows instead, and surplus rows on the opposite side are kept until
/// they exceed `batch_size`.
pub fn plan_scroll(
    window: &VisibleWindow,
    next: &VisibleRange,
    batch_size: usize,
    number_of_rows: usize,
) -> ScrollPlan {
    let forced = next.start_index..next.end_index;
    let mut out = VisibleWindow {
        forced_start: forced.start,
        forced_end: forced.end,
        ..*window
    };

    if forced.is_empty() {
        if window.is_empty() {
            return ScrollPlan {
                result: ScrollResult::None,
                patch: WindowPatch::default(),
                window: out,
            };
        }
        out.start = forced.start;
        out.end = forced.start;
        return ScrollPlan {
            result: ScrollResult::All,
            patch: WindowPatch {
                clear: true,
                ..WindowPatch::default()
            },
            window: out,
        };
    }

    if forced.start >= window.start && forced.end <= window.end {
        return ScrollPlan {
            result: ScrollResult::None,
            patch: WindowPatch::default(),
            window: out,
        };
    }

    if window.is_empty() || forced.end <= window.start || forced.start >= window.end {
        out.start = forced.start;
        out.end = forced.end;
        return ScrollPlan {
            result: ScrollResult::All,
            patch: WindowPatch {
                clear: !window.is_empty(),
                add_bottom: forced,
                ..WindowPatch::default()
            },
            window: out,
        };
    }

    let mut patch = WindowPatch::default();

    if forced.start < window.start {
        let missing = window.start - forced.start;
        let start = if missing < batch_size {
            window.start.saturating_sub(batch_size)
        } else {
            forced.start
        };
        patch.add_top = start..window.start;
        out.start = start;
    } else if forced.start - window.start > batch_size {
        patch.remove_top = window.start..forced.start;
        out.start = forced.start;
    }

    if forced.end > window.end {
        let missing = forced.end - window.end;
        let end = if missing < batch_size {
            window.end.saturating_add(batch_size).min(number_of_rows)
        } else {
            forced.end
        };
        patch.add_bottom = window.end..end;
        out.end = end;
    } else if window.end - forced.end > batch_size {
        patch.remove_bottom = forced.end..window.end;
        out.end = forced.end;
    }

    let result = if forced.start < window.start {
        ScrollResult::SomeTop
    } else {
        ScrollResult::SomeBottom
    };
    vtrace!(
        ?result,
        start = out.start,
        end = out.end,
        forced_start = out.forced_start,
        forced_end = out.forced_end,
        "plan_scroll"
    );

    ScrollPlan {
        result,
        patch,
        window: out,
    }
}

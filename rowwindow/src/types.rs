#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScrollDirection {
    Forward,
    Backward,
}

impl ScrollDirection {
    /// Direction of travel from `prev` to `next`; an unchanged offset counts as forward.
    pub fn between(prev: u64, next: u64) -> Self {
        if next < prev {
            Self::Backward
        } else {
            Self::Forward
        }
    }

    pub fn is_forward(self) -> bool {
        matches!(self, Self::Forward)
    }
}

/// A row whose padded height differs from the context's default row height.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeightException {
    pub index: usize,
    /// Top offset of the row in list coordinates.
    pub y: u64,
    /// Padded height.
    pub height: u32,
}

impl HeightException {
    pub fn y2(&self) -> u64 {
        self.y.saturating_add(self.height as u64)
    }
}

/// Position and padded height of a single row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RowGeometry {
    pub index: usize,
    pub y: u64,
    pub height: u32,
}

impl RowGeometry {
    pub fn end(&self) -> u64 {
        self.y.saturating_add(self.height as u64)
    }
}

/// The exact index window that covers a viewport.
///
/// `end_index` is exclusive. `first_row_pos..end_pos` is the pixel extent of the window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VisibleRange {
    pub start_index: usize,
    pub end_index: usize,
    pub first_row_pos: u64,
    pub end_pos: u64,
}

impl VisibleRange {
    pub const EMPTY: Self = Self {
        start_index: 0,
        end_index: 0,
        first_row_pos: 0,
        end_pos: 0,
    };

    pub fn is_empty(&self) -> bool {
        self.start_index >= self.end_index
    }

    pub fn len(&self) -> usize {
        self.end_index.saturating_sub(self.start_index)
    }

    pub fn last_index(&self) -> Option<usize> {
        (!self.is_empty()).then(|| self.end_index - 1)
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start_index && index < self.end_index
    }
}

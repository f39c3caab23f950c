use core::fmt;

use crate::{Deferred, Transition};

/// Scroll position and viewport size as reported by a surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrollMetrics {
    pub offset: u64,
    pub viewport: u32,
}

/// Visual override applied to a node while an animation runs.
///
/// `y` is in list coordinates, like [`rowwindow::RowGeometry::y`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeVisual {
    pub y: u64,
    pub height: u32,
    pub opacity: f32,
    pub transition: Option<Transition>,
}

/// The element tree a [`crate::Renderer`] drives.
///
/// Node handles are cheap copies (ids, indices into an arena, ...). Live nodes are kept in
/// index order as siblings inside a scrolled content container.
pub trait RenderSurface {
    type Node: Copy + Eq + fmt::Debug + 'static;

    /// Attaches `node` as the last child. An already attached node is moved.
    fn append(&mut self, node: Self::Node);

    fn insert_before(&mut self, node: Self::Node, anchor: Self::Node);

    fn remove(&mut self, node: Self::Node);

    fn scroll_metrics(&self) -> ScrollMetrics;

    /// Translates the content container so its first child sits at `y`.
    fn set_content_offset(&mut self, y: u64);

    /// Sizes the scrollable extent to the total logical height.
    fn set_sizer_extent(&mut self, total_height: u64);

    /// Height override for a row that differs from the default; `None` clears it.
    fn set_row_height(&mut self, _node: Self::Node, _height: Option<u32>) {}

    fn set_loading(&mut self, _node: Self::Node, _loading: bool) {}

    fn set_visual(&mut self, _node: Self::Node, _visual: &NodeVisual) {}

    fn clear_visual(&mut self, _node: Self::Node) {}

    fn set_header(&mut self, _header: Option<Self::Node>) {}

    fn set_scrolling_hint(&mut self, _scrolling: bool) {}

    /// The node will never be used again.
    fn dispose(&mut self, _node: Self::Node) {}
}

/// What an [`ItemFactory`] hands back for a row.
pub enum ItemOutput<N> {
    Ready(N),
    /// `placeholder` is shown (flagged as loading) until `ready` settles.
    Loading { placeholder: N, ready: Deferred<N> },
}

impl<N: Copy> ItemOutput<N> {
    pub fn node(&self) -> N {
        match self {
            Self::Ready(node) => *node,
            Self::Loading { placeholder, .. } => *placeholder,
        }
    }
}

impl<N: fmt::Debug> fmt::Debug for ItemOutput<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(node) => f.debug_tuple("Ready").field(node).finish(),
            Self::Loading { placeholder, ready } => f
                .debug_struct("Loading")
                .field("placeholder", placeholder)
                .field("ready", ready)
                .finish(),
        }
    }
}

/// Builds and rebinds row content.
pub trait ItemFactory<N> {
    fn create(&mut self, index: usize) -> ItemOutput<N>;

    /// Rebinds a pooled or live `node` to `index`. Returning a different node replaces it.
    fn update(&mut self, node: N, index: usize) -> ItemOutput<N>;

    fn create_header(&mut self) -> Option<N> {
        None
    }

    fn update_header(&mut self, _header: N) {}
}

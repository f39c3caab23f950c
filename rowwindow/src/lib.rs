//! Headless windowing core for virtualized row lists.
//!
//! For node pooling, scroll reaction, mixins and animated reconciliation, see the
//! `rowwindow-render` crate.
//!
//! Row geometry is described by an [`ExceptionContext`]: a default row height plus a sparse,
//! sorted list of rows whose height differs. On top of it this crate provides:
//! - [`resolve_range`]: scroll offset + viewport size → exact visible index window
//! - [`KeyFinder`]: forward-filled position cache with reverse lookup by stable key
//! - [`plan_scroll`]: the batched diff between the materialized window and a new range
//!
//! It is UI-agnostic and does not hold any UI objects.
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod context;
mod key;
mod key_finder;
mod range;
mod state;
mod types;
mod window;


pub use context::{ExceptionContext, FALLBACK_ROW_HEIGHT, Padding};
pub use key::{HeightLookup, KeyCacheKey, KeyIndexMap, KeyMap};
pub use key_finder::KeyFinder;
pub use range::resolve_range;
pub use state::ScrollState;
pub use types::{HeightException, RowGeometry, ScrollDirection, VisibleRange};
pub use window::{ScrollPlan, ScrollResult, VisibleWindow, WindowPatch, plan_scroll};

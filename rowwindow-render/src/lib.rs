//! Rendering layer for the `rowwindow` crate.
//!
//! `rowwindow` computes which rows a scroll position needs. This crate keeps an abstract
//! [`RenderSurface`] populated with exactly those rows:
//!
//! - [`Renderer`]: the scroll reaction core, batching window patches over a recycled node pool
//! - [`ScrollMixin`] hooks, with [`PrefetchMixin`] for prefetch and cleanup
//! - [`Deferred`] handles for abortable asynchronous row content
//! - [`ScrollHub`]: one scroll dispatcher per surface with sync, debounced and frame-coalesced
//!   delivery
//! - Key-based animated reconciliation when the row set is replaced
//!
//! The surface is a trait, so everything runs headlessly. Time is passed in as `now_ms`.
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod animate;
mod deferred;
mod dispatch;
mod mixin;
mod options;
mod pool;
mod renderer;
mod surface;
mod timer;
mod transition;

#[cfg(test)]
mod tests;

pub use animate::{
    AnimationItem, AnimationMode, AnimationOptions, FRAME_MS, Motion, Phase, PhaseFn, PlanEntry,
    ReconcilePlan, plan_reconcile,
};
pub use deferred::{Deferred, ItemError, Resolver, Settled, deferred};
pub use dispatch::{Delivery, ScrollDelivery, ScrollDispatcher, ScrollHub, SubscriptionId};
pub use mixin::{MixinFactory, PrefetchMixin, PrefetchOptions, ScrollMixin, WindowOps, prefetch};
pub use options::RendererOptions;
pub use pool::{LoadingReport, PoolStats};
pub use renderer::Renderer;
pub use surface::{ItemFactory, ItemOutput, NodeVisual, RenderSurface, ScrollMetrics};
pub use timer::{TimerId, TimerQueue};
pub use transition::{Easing, Transition};

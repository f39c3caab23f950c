use alloc::vec::Vec;
use core::fmt;

use crate::{MixinFactory, ScrollDelivery};

/// Configuration for a [`crate::Renderer`].
#[derive(Clone)]
pub struct RendererOptions {
    /// How the renderer's hub subscription receives scroll events.
    pub delivery: ScrollDelivery,
    /// Scroll deltas below this are ignored by the subscription.
    pub min_scroll_delta: u64,
    /// Slack rows added or kept at a window boundary to avoid single-row churn.
    pub batch_size: usize,
    /// Tell the surface when scrolling starts and stops.
    pub scrolling_hint: bool,
    /// Quiet time after the last scroll event before scrolling counts as stopped.
    pub scrolling_reset_delay_ms: u64,
    pub mixins: Vec<MixinFactory>,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl RendererOptions {
    pub fn new() -> Self {
        Self {
            delivery: ScrollDelivery::Sync,
            min_scroll_delta: 0,
            batch_size: 5,
            scrolling_hint: false,
            scrolling_reset_delay_ms: 150,
            mixins: Vec::new(),
        }
    }

    pub fn with_delivery(mut self, delivery: ScrollDelivery) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn with_min_scroll_delta(mut self, delta: u64) -> Self {
        self.min_scroll_delta = delta;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_scrolling_hint(mut self, enabled: bool) -> Self {
        self.scrolling_hint = enabled;
        self
    }

    pub fn with_scrolling_reset_delay_ms(mut self, delay_ms: u64) -> Self {
        self.scrolling_reset_delay_ms = delay_ms;
        self
    }

    pub fn with_mixin(mut self, mixin: MixinFactory) -> Self {
        self.mixins.push(mixin);
        self
    }
}

impl fmt::Debug for RendererOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererOptions")
            .field("delivery", &self.delivery)
            .field("min_scroll_delta", &self.min_scroll_delta)
            .field("batch_size", &self.batch_size)
            .field("scrolling_hint", &self.scrolling_hint)
            .field("scrolling_reset_delay_ms", &self.scrolling_reset_delay_ms)
            .field("mixins", &self.mixins.len())
            .finish()
    }
}

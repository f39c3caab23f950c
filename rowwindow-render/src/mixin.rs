use alloc::boxed::Box;
use alloc::sync::Arc;
use core::ops::Range;

use rowwindow::{ExceptionContext, ScrollDirection, ScrollResult, VisibleWindow};

use crate::{ScrollMetrics, TimerId};

/// What a [`ScrollMixin`] may see and do.
///
/// The add/remove primitives patch one boundary of the materialized window and keep it in sync
/// with the surface; they never touch the exact (forced) bounds.
pub trait WindowOps {
    fn window(&self) -> VisibleWindow;

    fn context(&self) -> &ExceptionContext;

    fn scroll_metrics(&self) -> ScrollMetrics;

    /// `range.end` must equal the current window start.
    fn add_at_beginning(&mut self, range: Range<usize>);

    /// `range.start` must equal the current window end.
    fn add_at_bottom(&mut self, range: Range<usize>);

    /// `range.start` must equal the current window start.
    fn remove_from_beginning(&mut self, range: Range<usize>);

    /// `range.end` must equal the current window end.
    fn remove_from_bottom(&mut self, range: Range<usize>);

    /// Re-syncs the content offset and scroll extent.
    fn update_offset(&mut self);

    fn now_ms(&self) -> u64;

    /// Schedules [`ScrollMixin::on_timer`] with `tag` on the calling mixin.
    fn schedule(&mut self, delay_ms: u64, tag: u32) -> TimerId;

    fn cancel(&mut self, timer: TimerId) -> bool;
}

/// A behavior layered on the scroll reaction.
///
/// Mixins run in registration order, after the core patch for an event has been applied.
pub trait ScrollMixin {
    fn name(&self) -> &'static str;

    fn on_scrolled(
        &mut self,
        ops: &mut dyn WindowOps,
        direction: ScrollDirection,
        result: ScrollResult,
    );

    fn on_timer(&mut self, _ops: &mut dyn WindowOps, _tag: u32) {}

    /// The row set was replaced; pending timers are already cancelled.
    fn on_reset(&mut self) {}
}

/// Builds a fresh mixin instance for each renderer.
pub type MixinFactory = Arc<dyn Fn() -> Box<dyn ScrollMixin> + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrefetchOptions {
    /// Rows materialized beyond the exact window in the direction of travel.
    pub prefetch_rows: usize,
    /// Rows kept on each side of the exact window once scrolling settles.
    pub clean_up_rows: usize,
    pub prefetch_delay_ms: u64,
    pub clean_up_delay_ms: u64,
}

impl Default for PrefetchOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl PrefetchOptions {
    pub fn new() -> Self {
        Self {
            prefetch_rows: 10,
            clean_up_rows: 5,
            prefetch_delay_ms: 20,
            clean_up_delay_ms: 500,
        }
    }

    pub fn with_prefetch_rows(mut self, rows: usize) -> Self {
        self.prefetch_rows = rows;
        self
    }

    pub fn with_clean_up_rows(mut self, rows: usize) -> Self {
        self.clean_up_rows = rows;
        self
    }

    pub fn with_prefetch_delay_ms(mut self, delay_ms: u64) -> Self {
        self.prefetch_delay_ms = delay_ms;
        self
    }

    pub fn with_clean_up_delay_ms(mut self, delay_ms: u64) -> Self {
        self.clean_up_delay_ms = delay_ms;
        self
    }
}

const PREFETCH: u32 = 0;
const CLEAN_UP: u32 = 1;

/// Extends the window ahead of the scroll direction and trims over-retained rows once the
/// window stops changing.
///
/// Every scroll event cancels the pending timer before scheduling a new one.
#[derive(Debug)]
pub struct PrefetchMixin {
    options: PrefetchOptions,
    pending: Option<TimerId>,
    direction: ScrollDirection,
}

impl PrefetchMixin {
    pub fn new(options: PrefetchOptions) -> Self {
        Self {
            options,
            pending: None,
            direction: ScrollDirection::Forward,
        }
    }

    fn prefetch(&self, ops: &mut dyn WindowOps) {
        let window = ops.window();
        let rows = ops.context().number_of_rows();
        if window.is_empty() {
            return;
        }
        match self.direction {
            ScrollDirection::Forward => {
                let end = window
                    .forced_end
                    .saturating_add(self.options.prefetch_rows)
                    .min(rows);
                if end > window.end {
                    ops.add_at_bottom(window.end..end);
                }
            }
            ScrollDirection::Backward => {
                let start = window.forced_start.saturating_sub(self.options.prefetch_rows);
                if start < window.start {
                    ops.add_at_beginning(start..window.start);
                }
            }
        }
        ops.update_offset();
    }

    fn clean_up(&self, ops: &mut dyn WindowOps) {
        let window = ops.window();
        if window.is_empty() || window.forced().is_empty() {
            return;
        }
        let keep_start = window
            .forced_start
            .saturating_sub(self.options.clean_up_rows)
            .clamp(window.start, window.end);
        let keep_end = window
            .forced_end
            .saturating_add(self.options.clean_up_rows)
            .clamp(keep_start, window.end);
        if keep_start > window.start {
            ops.remove_from_beginning(window.start..keep_start);
        }
        if keep_end < window.end {
            ops.remove_from_bottom(keep_end..window.end);
        }
        ops.update_offset();
    }
}

impl ScrollMixin for PrefetchMixin {
    fn name(&self) -> &'static str {
        "prefetch"
    }

    fn on_scrolled(
        &mut self,
        ops: &mut dyn WindowOps,
        direction: ScrollDirection,
        result: ScrollResult,
    ) {
        if let Some(timer) = self.pending.take() {
            ops.cancel(timer);
        }
        self.direction = direction;
        self.pending = Some(if result.is_none() {
            ops.schedule(self.options.clean_up_delay_ms, CLEAN_UP)
        } else {
            ops.schedule(self.options.prefetch_delay_ms, PREFETCH)
        });
    }

    fn on_timer(&mut self, ops: &mut dyn WindowOps, tag: u32) {
        self.pending = None;
        match tag {
            PREFETCH => {
                vtrace!(direction = ?self.direction, "prefetch");
                self.prefetch(ops);
            }
            CLEAN_UP => {
                vtrace!("clean_up");
                self.clean_up(ops);
            }
            _ => {}
        }
    }

    fn on_reset(&mut self) {
        self.pending = None;
    }
}

/// A [`MixinFactory`] for [`PrefetchMixin`].
pub fn prefetch(options: PrefetchOptions) -> MixinFactory {
    Arc::new(move || -> Box<dyn ScrollMixin> { Box::new(PrefetchMixin::new(options)) })
}

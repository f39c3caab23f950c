use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;
use core::ops::Range;

use rowwindow::{
    ExceptionContext, KeyCacheKey, ScrollDirection, ScrollPlan, ScrollResult, ScrollState,
    VisibleWindow, plan_scroll,
};

use crate::animate::PhaseScheduler;
use crate::pool::{LiveNode, PatchEngine};
use crate::{
    AnimationItem, AnimationOptions, Delivery, ItemFactory, LoadingReport, PoolStats,
    RenderSurface, RendererOptions, ScrollHub, ScrollMetrics, ScrollMixin, SubscriptionId,
    TimerId, TimerQueue, WindowOps, plan_reconcile,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Timer {
    Mixin { slot: usize, tag: u32 },
    Phase(usize),
    FinishAnimation,
    ScrollingReset,
}

/// Everything the patch primitives touch. Mixins see it through [`WindowOps`].
struct Core<S: RenderSurface, F> {
    surface: S,
    factory: F,
    context: ExceptionContext,
    engine: PatchEngine<S::Node>,
    window: VisibleWindow,
    timers: TimerQueue<Timer>,
    now_ms: u64,
    mixin_slot: usize,
}

impl<S: RenderSurface, F: ItemFactory<S::Node>> Core<S, F> {
    /// Applies a scroll plan: clear, removals, then additions, then the offset.
    fn apply(&mut self, plan: &ScrollPlan) {
        let patch = &plan.patch;
        if patch.clear {
            self.engine.remove_all(&mut self.surface);
        }
        self.engine
            .remove_from_beginning(&mut self.surface, patch.remove_top.clone());
        self.engine
            .remove_from_bottom(&mut self.surface, patch.remove_bottom.clone());
        self.engine.add_at_beginning(
            &mut self.surface,
            &mut self.factory,
            &self.context,
            patch.add_top.clone(),
        );
        self.engine.add_at_bottom(
            &mut self.surface,
            &mut self.factory,
            &self.context,
            patch.add_bottom.clone(),
        );
        self.window = plan.window;
        self.sync_offset();
    }

    fn sync_offset(&mut self) {
        self.engine.update_offset(&mut self.surface, &self.context);
    }
}

impl<S: RenderSurface, F: ItemFactory<S::Node>> WindowOps for Core<S, F> {
    fn window(&self) -> VisibleWindow {
        self.window
    }

    fn context(&self) -> &ExceptionContext {
        &self.context
    }

    fn scroll_metrics(&self) -> ScrollMetrics {
        self.surface.scroll_metrics()
    }

    fn add_at_beginning(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        let ok = !self.window.is_empty() && range.end == self.window.start;
        debug_assert!(ok, "add_at_beginning must end at the window start");
        if !ok {
            vwarn!(start = range.start, end = range.end, "add_at_beginning: not adjacent");
            return;
        }
        self.window.start = range.start;
        self.engine
            .add_at_beginning(&mut self.surface, &mut self.factory, &self.context, range);
    }

    fn add_at_bottom(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        let ok = (self.window.is_empty() || range.start == self.window.end)
            && range.end <= self.context.number_of_rows();
        debug_assert!(ok, "add_at_bottom must start at the window end");
        if !ok {
            vwarn!(start = range.start, end = range.end, "add_at_bottom: not adjacent");
            return;
        }
        if self.window.is_empty() {
            self.window.start = range.start;
        }
        self.window.end = range.end;
        self.engine
            .add_at_bottom(&mut self.surface, &mut self.factory, &self.context, range);
    }

    fn remove_from_beginning(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        let ok = range.start == self.window.start && range.end <= self.window.end;
        debug_assert!(ok, "remove_from_beginning must start at the window start");
        if !ok {
            vwarn!(start = range.start, end = range.end, "remove_from_beginning: out of window");
            return;
        }
        self.window.start = range.end;
        self.engine.remove_from_beginning(&mut self.surface, range);
    }

    fn remove_from_bottom(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        let ok = range.end == self.window.end && range.start >= self.window.start;
        debug_assert!(ok, "remove_from_bottom must end at the window end");
        if !ok {
            vwarn!(start = range.start, end = range.end, "remove_from_bottom: out of window");
            return;
        }
        self.window.end = range.start;
        self.engine.remove_from_bottom(&mut self.surface, range);
    }

    fn update_offset(&mut self) {
        self.sync_offset();
    }

    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn schedule(&mut self, delay_ms: u64, tag: u32) -> TimerId {
        let slot = self.mixin_slot;
        self.timers
            .schedule(self.now_ms, delay_ms, Timer::Mixin { slot, tag })
    }

    fn cancel(&mut self, timer: TimerId) -> bool {
        self.timers.cancel(timer)
    }
}

/// Keeps a [`RenderSurface`] populated with exactly the rows a scroll position needs.
///
/// The renderer holds no clock. Hosts drive it by calling:
/// - `on_scrolled` / `sync_with_surface` (or `deliver` with a [`ScrollHub`]) on scroll events
/// - `tick(now_ms)` whenever the returned deadline passes (mixin timers, animation phases,
///   scrolling hint reset)
/// - `poll_loading` after asynchronous item content settles
pub struct Renderer<S: RenderSurface, F> {
    core: Core<S, F>,
    options: RendererOptions,
    mixins: Vec<Box<dyn ScrollMixin>>,
    animation: Option<PhaseScheduler<S::Node>>,
    header: Option<S::Node>,
    scroll: ScrollState,
    last_offset: Option<u64>,
    scrolling_timer: Option<TimerId>,
    subscription: Option<SubscriptionId>,
}

impl<S: RenderSurface, F: ItemFactory<S::Node>> Renderer<S, F> {
    pub fn new(surface: S, factory: F, context: ExceptionContext, options: RendererOptions) -> Self {
        let mixins = options.mixins.iter().map(|make| make()).collect();
        Self {
            core: Core {
                surface,
                factory,
                context,
                engine: PatchEngine::new(),
                window: VisibleWindow::EMPTY,
                timers: TimerQueue::new(),
                now_ms: 0,
                mixin_slot: 0,
            },
            options,
            mixins,
            animation: None,
            header: None,
            scroll: ScrollState::default(),
            last_offset: None,
            scrolling_timer: None,
            subscription: None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.core.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.core.surface
    }

    pub fn factory(&self) -> &F {
        &self.core.factory
    }

    pub fn factory_mut(&mut self) -> &mut F {
        &mut self.core.factory
    }

    pub fn context(&self) -> &ExceptionContext {
        &self.core.context
    }

    pub fn options(&self) -> &RendererOptions {
        &self.options
    }

    pub fn window(&self) -> VisibleWindow {
        self.core.window
    }

    pub fn header(&self) -> Option<S::Node> {
        self.header
    }

    /// Live `(row index, node)` pairs in index order.
    pub fn live_nodes(&self) -> Vec<(usize, S::Node)> {
        self.core.engine.live_nodes().collect()
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.core.engine.stats()
    }

    pub fn scroll_state(&self) -> ScrollState {
        self.scroll
    }

    pub fn mixin_names(&self) -> Vec<&'static str> {
        self.mixins.iter().map(|m| m.name()).collect()
    }

    pub fn subscription(&self) -> Option<SubscriptionId> {
        self.subscription
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Earliest pending timer deadline.
    pub fn next_due(&self) -> Option<u64> {
        self.core.timers.next_due()
    }

    /// First render: creates the header row and materializes the rows under the surface's
    /// current scroll position.
    pub fn render(&mut self, now_ms: u64) -> ScrollResult {
        if self.header.is_none() {
            self.header = self.core.factory.create_header();
            if let Some(header) = self.header {
                self.core.surface.set_header(Some(header));
            }
        }
        self.sync_with_surface(now_ms)
    }

    /// Reacts to the surface's current scroll metrics.
    pub fn sync_with_surface(&mut self, now_ms: u64) -> ScrollResult {
        let metrics = self.core.surface.scroll_metrics();
        let direction = self
            .last_offset
            .map_or(ScrollDirection::Forward, |prev| {
                ScrollDirection::between(prev, metrics.offset)
            });
        self.on_scrolled(metrics.offset, metrics.viewport, direction, now_ms)
    }

    /// Patches the window for a new scroll position, then runs the mixins.
    ///
    /// An in-flight reconciliation animation is fast-forwarded first.
    pub fn on_scrolled(
        &mut self,
        offset: u64,
        viewport: u32,
        direction: ScrollDirection,
        now_ms: u64,
    ) -> ScrollResult {
        self.note_scroll(offset, viewport, now_ms);
        self.react(offset, viewport, direction, now_ms)
    }

    fn note_scroll(&mut self, offset: u64, viewport: u32, now_ms: u64) {
        let moved = self.last_offset.is_some_and(|prev| prev != offset);
        self.last_offset = Some(offset);
        self.scroll.offset = offset;
        self.scroll.viewport = viewport;
        if !moved {
            return;
        }
        if let Some(timer) = self.scrolling_timer.take() {
            self.core.timers.cancel(timer);
        }
        self.scrolling_timer = Some(self.core.timers.schedule(
            now_ms,
            self.options.scrolling_reset_delay_ms,
            Timer::ScrollingReset,
        ));
        if !self.scroll.is_scrolling {
            self.scroll.is_scrolling = true;
            if self.options.scrolling_hint {
                self.core.surface.set_scrolling_hint(true);
            }
        }
    }

    fn react(
        &mut self,
        offset: u64,
        viewport: u32,
        direction: ScrollDirection,
        now_ms: u64,
    ) -> ScrollResult {
        self.core.now_ms = now_ms;
        self.abort_animation();

        let range = self.core.context.resolve_range(offset, viewport);
        let plan = plan_scroll(
            &self.core.window,
            &range,
            self.options.batch_size,
            self.core.context.number_of_rows(),
        );
        if plan.result.is_all() {
            vdebug!(
                offset,
                viewport,
                start = plan.window.start,
                end = plan.window.end,
                "full rebuild"
            );
        }
        self.core.apply(&plan);

        for (slot, mixin) in self.mixins.iter_mut().enumerate() {
            self.core.mixin_slot = slot;
            mixin.on_scrolled(&mut self.core, direction, plan.result);
        }
        plan.result
    }

    /// Fires due timers. Returns the next deadline, if any.
    pub fn tick(&mut self, now_ms: u64) -> Option<u64> {
        self.core.now_ms = now_ms;
        while let Some((_, timer)) = self.core.timers.pop_due(now_ms) {
            vtrace!(?timer, now_ms, "timer fired");
            match timer {
                Timer::Mixin { slot, tag } => {
                    if let Some(mixin) = self.mixins.get_mut(slot) {
                        self.core.mixin_slot = slot;
                        mixin.on_timer(&mut self.core, tag);
                    }
                }
                Timer::Phase(phase) => {
                    if let Some(animation) = self.animation.as_mut() {
                        animation.apply(phase, &mut self.core.surface);
                    }
                }
                Timer::FinishAnimation => self.finish_animation(),
                Timer::ScrollingReset => {
                    self.scrolling_timer = None;
                    self.scroll.is_scrolling = false;
                    if self.options.scrolling_hint {
                        self.core.surface.set_scrolling_hint(false);
                    }
                }
            }
        }
        self.core.timers.next_due()
    }

    /// Swaps settled loading placeholders for their content.
    pub fn poll_loading(&mut self) -> LoadingReport {
        self.core
            .engine
            .poll_loading(&mut self.core.surface, &self.core.context)
    }

    /// Rebinds the live rows in `range` through [`ItemFactory::update`].
    pub fn refresh_rows(&mut self, range: Range<usize>) {
        self.core.engine.refresh(
            &mut self.core.surface,
            &mut self.core.factory,
            &self.core.context,
            range,
        );
    }

    /// Replaces the row set without animation.
    ///
    /// Live nodes are recycled and the whole pool is dropped, since pooled nodes are bound to
    /// rows of the old set.
    pub fn replace_context(&mut self, next: ExceptionContext, now_ms: u64) -> ScrollResult {
        self.abort_animation();
        self.reset_mixins();
        self.core.engine.remove_all(&mut self.core.surface);
        self.core.engine.clear_pool(&mut self.core.surface);
        vdebug!(rows = next.number_of_rows(), "replace_context");
        self.core.context = next;
        self.core.window = VisibleWindow::EMPTY;
        self.update_header();

        let metrics = self.core.surface.scroll_metrics();
        self.react(
            metrics.offset,
            metrics.viewport,
            ScrollDirection::Forward,
            now_ms,
        )
    }

    /// Replaces the row set and animates live rows to their new places by key.
    ///
    /// Rows are matched with `old_key` over the current rows and `new_key` over `next`. The
    /// returned items list every node involved: each node live before the call exactly once, plus
    /// nodes created for the new window. Zero-delay phases are applied before new nodes are
    /// attached; later phases run from [`Self::tick`].
    pub fn replace_context_animated<K, OK, NK>(
        &mut self,
        next: ExceptionContext,
        old_key: OK,
        new_key: NK,
        animation: &AnimationOptions,
        now_ms: u64,
    ) -> Vec<AnimationItem<S::Node, K>>
    where
        K: KeyCacheKey + Clone,
        OK: Fn(usize) -> K,
        NK: Fn(usize) -> K,
    {
        self.abort_animation();
        self.reset_mixins();
        self.core.now_ms = now_ms;

        let metrics = self.core.surface.scroll_metrics();
        let range = next.resolve_range(metrics.offset, metrics.viewport);
        let live = self.core.engine.take_live();
        let live_indexes: Vec<usize> = live.iter().map(|l| l.index).collect();
        let plan = plan_reconcile(
            &self.core.context,
            &next,
            &live_indexes,
            range,
            old_key,
            new_key,
            animation.short_circuit_threshold,
        );

        let mut slots: Vec<Option<LiveNode<S::Node>>> = live.into_iter().map(Some).collect();
        let mut entering: Vec<LiveNode<S::Node>> = Vec::with_capacity(range.len());
        let mut items = Vec::with_capacity(plan.entries.len());
        for entry in plan.entries {
            let taken = entry
                .live
                .and_then(|at| slots.get_mut(at))
                .and_then(Option::take);
            let node = if entry.motion.mode.is_leaving() {
                let Some(mut live) = taken else {
                    continue;
                };
                self.core
                    .engine
                    .abort_loading(&mut self.core.surface, &mut live);
                live.node
            } else {
                let index = range.start_index + entering.len();
                let bound = match taken {
                    Some(live) => self.core.engine.rebind_attached(
                        &mut self.core.surface,
                        &mut self.core.factory,
                        &next,
                        live,
                        index,
                    ),
                    None => self.core.engine.acquire(
                        &mut self.core.surface,
                        &mut self.core.factory,
                        &next,
                        index,
                    ),
                };
                let node = bound.node;
                entering.push(bound);
                node
            };
            items.push(AnimationItem {
                motion: entry.motion,
                node,
                key: entry.key,
                short_circuited: entry.short_circuited,
            });
        }

        let mut scheduler = PhaseScheduler::new(&items, animation);
        scheduler.apply_immediate(&mut self.core.surface);
        for live in &entering {
            self.core.surface.append(live.node);
        }
        self.core.engine.adopt(entering);
        self.core.window = VisibleWindow {
            start: range.start_index,
            end: range.end_index,
            forced_start: range.start_index,
            forced_end: range.end_index,
        };
        self.core.context = next;
        self.core.sync_offset();
        self.update_header();

        let mut timers = Vec::new();
        for (phase, p) in scheduler.phases().iter().enumerate() {
            if p.delay_ms > 0 {
                timers.push(
                    self.core
                        .timers
                        .schedule(now_ms, p.delay_ms, Timer::Phase(phase)),
                );
            }
        }
        timers.push(self.core.timers.schedule(
            now_ms,
            animation.total_ms(),
            Timer::FinishAnimation,
        ));
        scheduler.set_timers(timers);
        self.animation = Some(scheduler);
        vdebug!(items = items.len(), "reconciliation started");
        items
    }

    /// Jumps a running reconciliation to its terminal phase and cleans up.
    ///
    /// Returns `false` if nothing was animating.
    pub fn abort_animation(&mut self) -> bool {
        let Some(animation) = self.animation.as_mut() else {
            return false;
        };
        animation.fast_forward(&mut self.core.surface);
        self.finish_animation();
        true
    }

    fn finish_animation(&mut self) {
        let Some(mut animation) = self.animation.take() else {
            return;
        };
        for timer in animation.take_timers() {
            self.core.timers.cancel(timer);
        }
        let leaving = animation.finish(&mut self.core.surface);
        for node in leaving {
            self.core.engine.release(&mut self.core.surface, node);
        }
        vdebug!("reconciliation finished");
    }

    fn reset_mixins(&mut self) {
        self.core
            .timers
            .retain(|t| !matches!(t, Timer::Mixin { .. }));
        for mixin in &mut self.mixins {
            mixin.on_reset();
        }
    }

    fn update_header(&mut self) {
        if let Some(header) = self.header {
            self.core.factory.update_header(header);
        }
    }

    /// Subscribes to `surface_id`'s scroll events with the configured delivery mode.
    ///
    /// A previous subscription on the same hub is dropped.
    pub fn attach<K: KeyCacheKey + Clone>(
        &mut self,
        hub: &mut ScrollHub<K>,
        surface_id: K,
    ) -> SubscriptionId {
        self.detach(hub);
        let id = hub.subscribe(
            surface_id,
            self.options.delivery,
            self.options.min_scroll_delta,
        );
        self.subscription = Some(id);
        id
    }

    pub fn detach<K: KeyCacheKey + Clone>(&mut self, hub: &mut ScrollHub<K>) -> bool {
        self.subscription
            .take()
            .is_some_and(|id| hub.unsubscribe(id))
    }

    /// Handles a hub delivery addressed to this renderer; ignores others.
    pub fn deliver(&mut self, delivery: &Delivery, now_ms: u64) -> Option<ScrollResult> {
        if self.subscription != Some(delivery.subscription) {
            return None;
        }
        let viewport = self.core.surface.scroll_metrics().viewport;
        Some(self.on_scrolled(delivery.offset, viewport, delivery.direction, now_ms))
    }

    /// Detaches and disposes every node and hands back the surface and factory.
    pub fn destroy(mut self) -> (S, F) {
        self.abort_animation();
        self.core.timers.clear();
        self.core.engine.destroy(&mut self.core.surface);
        if let Some(header) = self.header.take() {
            self.core.surface.set_header(None);
            self.core.surface.dispose(header);
        }
        vdebug!("renderer destroyed");
        let Self { core, .. } = self;
        (core.surface, core.factory)
    }
}

impl<S: RenderSurface, F> fmt::Debug for Renderer<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("window", &self.core.window)
            .field("scroll", &self.scroll)
            .field("stats", &self.core.engine.stats())
            .field("animating", &self.animation.is_some())
            .finish_non_exhaustive()
    }
}

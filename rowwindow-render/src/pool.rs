use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::ops::Range;

use rowwindow::ExceptionContext;

use crate::{Deferred, ItemError, ItemFactory, ItemOutput, RenderSurface, Settled};

/// Counters for observing node churn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Nodes currently attached for a row.
    pub live: usize,
    /// Detached nodes waiting for reuse.
    pub pooled: usize,
    /// Calls to [`ItemFactory::create`].
    pub created: usize,
    /// Pooled nodes rebound through [`ItemFactory::update`].
    pub reused: usize,
    /// Nodes returned to the pool.
    pub recycled: usize,
    /// In-flight loads aborted on recycle.
    pub aborted: usize,
}

/// Outcome of [`crate::Renderer::poll_loading`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadingReport {
    pub resolved: Vec<usize>,
    pub failed: Vec<(usize, ItemError)>,
}

impl LoadingReport {
    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty() && self.failed.is_empty()
    }
}

#[derive(Debug)]
pub(crate) struct LiveNode<N> {
    pub(crate) index: usize,
    pub(crate) node: N,
    pub(crate) pending: Option<Deferred<N>>,
}

/// Keeps the surface's live nodes in exact correspondence with a contiguous index window.
///
/// Rows are only added or removed at the two boundaries, so live nodes stay sorted by index.
#[derive(Debug)]
pub(crate) struct PatchEngine<N> {
    live: VecDeque<LiveNode<N>>,
    pool: Vec<N>,
    stats: PoolStats,
}

impl<N: Copy + Eq + core::fmt::Debug + 'static> PatchEngine<N> {
    pub(crate) fn new() -> Self {
        Self {
            live: VecDeque::new(),
            pool: Vec::new(),
            stats: PoolStats::default(),
        }
    }

    pub(crate) fn stats(&self) -> PoolStats {
        PoolStats {
            live: self.live.len(),
            pooled: self.pool.len(),
            ..self.stats
        }
    }

    pub(crate) fn live_nodes(&self) -> impl Iterator<Item = (usize, N)> + '_ {
        self.live.iter().map(|l| (l.index, l.node))
    }

    pub(crate) fn first_node(&self) -> Option<N> {
        self.live.front().map(|l| l.node)
    }

    /// Binds `index` to a pooled node, or creates one. The result is not attached.
    pub(crate) fn acquire<S, F>(
        &mut self,
        surface: &mut S,
        factory: &mut F,
        context: &ExceptionContext,
        index: usize,
    ) -> LiveNode<N>
    where
        S: RenderSurface<Node = N>,
        F: ItemFactory<N>,
    {
        let (output, previous) = match self.pool.pop() {
            Some(node) => {
                self.stats.reused += 1;
                (factory.update(node, index), Some(node))
            }
            None => {
                self.stats.created += 1;
                (factory.create(index), None)
            }
        };

        let (bound, pending) = match output {
            ItemOutput::Ready(node) => (node, None),
            ItemOutput::Loading { placeholder, ready } => {
                surface.set_loading(placeholder, true);
                (placeholder, Some(ready))
            }
        };
        if let Some(previous) = previous.filter(|p| *p != bound) {
            surface.dispose(previous);
        }
        surface.set_row_height(bound, context.exception_height(index));
        LiveNode {
            index,
            node: bound,
            pending,
        }
    }

    pub(crate) fn add_at_beginning<S, F>(
        &mut self,
        surface: &mut S,
        factory: &mut F,
        context: &ExceptionContext,
        range: Range<usize>,
    ) where
        S: RenderSurface<Node = N>,
        F: ItemFactory<N>,
    {
        if range.is_empty() {
            return;
        }
        debug_assert!(
            self.live.front().is_none_or(|l| l.index == range.end),
            "rows must be added next to the first live row"
        );
        vtrace!(start = range.start, end = range.end, "add_at_beginning");
        let anchor = self.first_node();
        let mut added = Vec::with_capacity(range.len());
        for index in range {
            let live = self.acquire(surface, factory, context, index);
            match anchor {
                Some(anchor) => surface.insert_before(live.node, anchor),
                None => surface.append(live.node),
            }
            added.push(live);
        }
        for live in added.into_iter().rev() {
            self.live.push_front(live);
        }
    }

    pub(crate) fn add_at_bottom<S, F>(
        &mut self,
        surface: &mut S,
        factory: &mut F,
        context: &ExceptionContext,
        range: Range<usize>,
    ) where
        S: RenderSurface<Node = N>,
        F: ItemFactory<N>,
    {
        if range.is_empty() {
            return;
        }
        debug_assert!(
            self.live.back().is_none_or(|l| l.index + 1 == range.start),
            "rows must be added next to the last live row"
        );
        vtrace!(start = range.start, end = range.end, "add_at_bottom");
        for index in range {
            let live = self.acquire(surface, factory, context, index);
            surface.append(live.node);
            self.live.push_back(live);
        }
    }

    pub(crate) fn remove_from_beginning<S: RenderSurface<Node = N>>(
        &mut self,
        surface: &mut S,
        range: Range<usize>,
    ) {
        if range.is_empty() {
            return;
        }
        debug_assert!(
            self.live.front().is_some_and(|l| l.index == range.start),
            "rows must be removed from the first live row"
        );
        vtrace!(start = range.start, end = range.end, "remove_from_beginning");
        while let Some(live) = self.live.front() {
            if live.index >= range.end {
                break;
            }
            if let Some(live) = self.live.pop_front() {
                self.recycle(surface, live);
            }
        }
    }

    pub(crate) fn remove_from_bottom<S: RenderSurface<Node = N>>(
        &mut self,
        surface: &mut S,
        range: Range<usize>,
    ) {
        if range.is_empty() {
            return;
        }
        debug_assert!(
            self.live.back().is_some_and(|l| l.index + 1 == range.end),
            "rows must be removed from the last live row"
        );
        vtrace!(start = range.start, end = range.end, "remove_from_bottom");
        let at = self.live.partition_point(|l| l.index < range.start);
        let removed = self.live.split_off(at);
        for live in removed {
            self.recycle(surface, live);
        }
    }

    pub(crate) fn remove_all<S: RenderSurface<Node = N>>(&mut self, surface: &mut S) {
        for live in core::mem::take(&mut self.live) {
            self.recycle(surface, live);
        }
    }

    /// Detaches `live`, aborting its in-flight load, and pools its node.
    fn recycle<S: RenderSurface<Node = N>>(&mut self, surface: &mut S, mut live: LiveNode<N>) {
        surface.remove(live.node);
        self.drop_pending(surface, &mut live);
        self.release_detached(surface, live.node);
    }

    /// Stops tracking `live`'s load and clears its loading state.
    ///
    /// A load that is still in flight is aborted. One that settled before it was polled has its
    /// resolved node disposed, unless that node is the one already bound.
    fn drop_pending<S: RenderSurface<Node = N>>(
        &mut self,
        surface: &mut S,
        live: &mut LiveNode<N>,
    ) {
        let Some(mut ready) = live.pending.take() else {
            return;
        };
        surface.set_loading(live.node, false);
        if ready.abort() {
            self.stats.aborted += 1;
            return;
        }
        if let Some(Settled::Ready(node)) = ready.try_take() {
            if node != live.node {
                vtrace!(index = live.index, "dispose unpolled content");
                surface.dispose(node);
            }
        }
    }

    /// Pools a node that is already detached.
    fn release_detached<S: RenderSurface<Node = N>>(&mut self, surface: &mut S, node: N) {
        surface.set_row_height(node, None);
        surface.clear_visual(node);
        self.pool.push(node);
        self.stats.recycled += 1;
    }

    /// Detaches and pools a node that is not tracked as live.
    pub(crate) fn release<S: RenderSurface<Node = N>>(&mut self, surface: &mut S, node: N) {
        surface.remove(node);
        self.release_detached(surface, node);
    }

    pub(crate) fn clear_pool<S: RenderSurface<Node = N>>(&mut self, surface: &mut S) {
        vdebug!(pooled = self.pool.len(), "clear_pool");
        for node in self.pool.drain(..) {
            surface.dispose(node);
        }
    }

    /// Hands the live nodes to the caller, leaving them attached.
    pub(crate) fn take_live(&mut self) -> Vec<LiveNode<N>> {
        core::mem::take(&mut self.live).into()
    }

    /// Replaces the live set with already attached nodes in index order.
    pub(crate) fn adopt(&mut self, live: Vec<LiveNode<N>>) {
        debug_assert!(self.live.is_empty(), "adopt over a non-empty live set");
        debug_assert!(live.windows(2).all(|w| w[0].index + 1 == w[1].index));
        self.live = live.into();
    }

    /// Aborts an in-flight load on a node that is leaving.
    pub(crate) fn abort_loading<S: RenderSurface<Node = N>>(
        &mut self,
        surface: &mut S,
        live: &mut LiveNode<N>,
    ) {
        self.drop_pending(surface, live);
    }

    pub(crate) fn update_offset<S: RenderSurface<Node = N>>(
        &self,
        surface: &mut S,
        context: &ExceptionContext,
    ) {
        let y = self.live.front().map_or(0, |l| context.row_top(l.index));
        surface.set_content_offset(y);
        surface.set_sizer_extent(context.total_height());
    }

    /// Swaps settled placeholders for their content.
    pub(crate) fn poll_loading<S: RenderSurface<Node = N>>(
        &mut self,
        surface: &mut S,
        context: &ExceptionContext,
    ) -> LoadingReport {
        let mut report = LoadingReport::default();
        let mut released = Vec::new();
        for live in self.live.iter_mut() {
            let Some(outcome) = live.pending.as_mut().and_then(Deferred::try_take) else {
                continue;
            };
            live.pending = None;
            surface.set_loading(live.node, false);
            match outcome {
                Settled::Ready(node) => {
                    if node != live.node {
                        surface.insert_before(node, live.node);
                        surface.remove(live.node);
                        released.push(live.node);
                        live.node = node;
                    }
                    surface.set_row_height(node, context.exception_height(live.index));
                    report.resolved.push(live.index);
                }
                Settled::Failed(err) => {
                    vwarn!(index = live.index, error = %err, "item content failed");
                    report.failed.push((live.index, err));
                }
                Settled::Aborted => {}
            }
        }
        for node in released {
            self.release_detached(surface, node);
        }
        report
    }

    /// Rebinds an attached node to `index`, keeping its position on the surface.
    pub(crate) fn rebind_attached<S, F>(
        &mut self,
        surface: &mut S,
        factory: &mut F,
        context: &ExceptionContext,
        mut live: LiveNode<N>,
        index: usize,
    ) -> LiveNode<N>
    where
        S: RenderSurface<Node = N>,
        F: ItemFactory<N>,
    {
        let old = live.node;
        self.drop_pending(surface, &mut live);
        let (node, pending) = match factory.update(old, index) {
            ItemOutput::Ready(node) => (node, None),
            ItemOutput::Loading { placeholder, ready } => {
                surface.set_loading(placeholder, true);
                (placeholder, Some(ready))
            }
        };
        if node != old {
            surface.insert_before(node, old);
            surface.remove(old);
            surface.dispose(old);
        }
        surface.set_row_height(node, context.exception_height(index));
        LiveNode {
            index,
            node,
            pending,
        }
    }

    /// Rebinds live rows in `range` in place.
    pub(crate) fn refresh<S, F>(
        &mut self,
        surface: &mut S,
        factory: &mut F,
        context: &ExceptionContext,
        range: Range<usize>,
    ) where
        S: RenderSurface<Node = N>,
        F: ItemFactory<N>,
    {
        vtrace!(start = range.start, end = range.end, "refresh");
        let live = core::mem::take(&mut self.live);
        let refreshed: VecDeque<LiveNode<N>> = live
            .into_iter()
            .map(|l| {
                if range.contains(&l.index) {
                    let index = l.index;
                    self.rebind_attached(surface, factory, context, l, index)
                } else {
                    l
                }
            })
            .collect();
        self.live = refreshed;
    }

    /// Detaches and disposes every node.
    pub(crate) fn destroy<S: RenderSurface<Node = N>>(&mut self, surface: &mut S) {
        for mut live in core::mem::take(&mut self.live) {
            self.drop_pending(surface, &mut live);
            surface.remove(live.node);
            surface.dispose(live.node);
        }
        self.clear_pool(surface);
    }
}

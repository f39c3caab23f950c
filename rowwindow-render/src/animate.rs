use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use rowwindow::{ExceptionContext, KeyCacheKey, KeyFinder, KeyIndexMap, RowGeometry, VisibleRange};

use crate::{Easing, NodeVisual, RenderSurface, TimerId, Transition};

/// How a node takes part in a reconciliation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AnimationMode {
    /// Live before and visible after.
    Update,
    /// Present in the old rows but not materialized; created for the new window.
    UpdateCreate,
    /// Live before, still present in the new rows but off-screen.
    UpdateRemove,
    /// New row.
    Show,
    /// Row no longer exists.
    Hide,
}

impl AnimationMode {
    /// The node is detached when the animation finishes.
    pub fn is_leaving(self) -> bool {
        matches!(self, Self::UpdateRemove | Self::Hide)
    }
}

/// Where a row was and where it goes. Geometry is in list coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Motion {
    pub mode: AnimationMode,
    pub previous: Option<RowGeometry>,
    pub current: Option<RowGeometry>,
}

/// One entry of a reconciliation plan.
///
/// `live` is the position of the node in the pre-reconciliation live list, if it had one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanEntry<K> {
    pub motion: Motion,
    pub key: K,
    pub live: Option<usize>,
    /// Movement is negligible; the node jumps straight to its final state.
    pub short_circuited: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcilePlan<K> {
    /// Exact window of the new rows.
    pub range: VisibleRange,
    /// Entering rows in index order, then leaving rows in live order.
    pub entries: Vec<PlanEntry<K>>,
}

/// A planned entry bound to its node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnimationItem<N, K> {
    pub motion: Motion,
    pub node: N,
    pub key: K,
    pub short_circuited: bool,
}

/// Diffs live rows against a new row set by key.
///
/// `live_indexes` are the old row indexes of the live nodes, in order. Every one of them
/// appears in the plan exactly once. When several live rows share a key, the first one is
/// matched and the rest leave.
pub fn plan_reconcile<K, OK, NK>(
    old: &ExceptionContext,
    next: &ExceptionContext,
    live_indexes: &[usize],
    range: VisibleRange,
    old_key: OK,
    new_key: NK,
    short_circuit_threshold: u32,
) -> ReconcilePlan<K>
where
    K: KeyCacheKey + Clone,
    OK: Fn(usize) -> K,
    NK: Fn(usize) -> K,
{
    let mut old_rows = KeyFinder::new(old, old_key);
    let mut new_rows = KeyFinder::new(next, new_key);

    let mut snapshot = KeyIndexMap::<K>::new();
    for (at, &index) in live_indexes.iter().enumerate() {
        snapshot.entry(old_rows.key_of(index)).or_insert(at);
    }
    let mut consumed = vec![false; live_indexes.len()];
    let mut entries = Vec::with_capacity(range.len() + live_indexes.len());

    for index in range.start_index..range.end_index {
        let key = new_rows.key_of(index);
        let current = new_rows.pos_by_index(index);
        let (mode, previous, live) = match snapshot.get(&key).copied() {
            Some(at) if !consumed[at] => {
                consumed[at] = true;
                (
                    AnimationMode::Update,
                    Some(old.row_geometry(live_indexes[at])),
                    Some(at),
                )
            }
            _ => match old_rows.pos_by_key(&key) {
                Some(pos) => (AnimationMode::UpdateCreate, Some(pos), None),
                None => (AnimationMode::Show, None, None),
            },
        };
        let short_circuited = mode == AnimationMode::Update
            && matches!((previous, current), (Some(p), Some(c))
                if p.y.abs_diff(c.y) <= short_circuit_threshold as u64
                    && p.height.abs_diff(c.height) <= short_circuit_threshold);
        entries.push(PlanEntry {
            motion: Motion {
                mode,
                previous,
                current,
            },
            key,
            live,
            short_circuited,
        });
    }

    for (at, &index) in live_indexes.iter().enumerate() {
        if consumed[at] {
            continue;
        }
        let key = old_rows.key_of(index);
        let current = new_rows.pos_by_key(&key);
        let mode = if current.is_some() {
            AnimationMode::UpdateRemove
        } else {
            AnimationMode::Hide
        };
        entries.push(PlanEntry {
            motion: Motion {
                mode,
                previous: Some(old.row_geometry(index)),
                current,
            },
            key,
            live: Some(at),
            short_circuited: false,
        });
    }

    vdebug!(
        entries = entries.len(),
        start = range.start_index,
        end = range.end_index,
        "plan_reconcile"
    );
    ReconcilePlan { range, entries }
}

/// Computes a node's visual for one phase, or `None` to leave it alone.
pub type PhaseFn = Arc<dyn Fn(&Motion) -> Option<NodeVisual> + Send + Sync>;

/// One step of an animation, applied to every item `delay_ms` after the sequence starts.
#[derive(Clone)]
pub struct Phase {
    pub delay_ms: u64,
    pub visual: PhaseFn,
}

impl Phase {
    pub fn new(
        delay_ms: u64,
        visual: impl Fn(&Motion) -> Option<NodeVisual> + Send + Sync + 'static,
    ) -> Self {
        Self {
            delay_ms,
            visual: Arc::new(visual),
        }
    }
}

impl fmt::Debug for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Phase")
            .field("delay_ms", &self.delay_ms)
            .finish_non_exhaustive()
    }
}

/// Delay of the phase that starts movement, so the first phase gets painted.
pub const FRAME_MS: u64 = 16;

#[derive(Clone, Debug)]
pub struct AnimationOptions {
    pub phases: Vec<Phase>,
    /// Time after the last phase before leaving nodes are recycled and visuals cleared.
    pub settle_ms: u64,
    /// `Update` items that move and resize by at most this many pixels are not animated.
    pub short_circuit_threshold: u32,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self::flip(200, Easing::EaseInOutCubic)
    }
}

impl AnimationOptions {
    /// Move every row from its old to its new geometry, fade out rows that leave, then fade in
    /// new rows.
    pub fn flip(duration_ms: u64, easing: Easing) -> Self {
        let transition = Transition::new(duration_ms, easing);
        let first = Phase::new(0, |m: &Motion| {
            let from = m.previous.or(m.current)?;
            Some(NodeVisual {
                y: from.y,
                height: from.height,
                opacity: if m.mode == AnimationMode::Show { 0.0 } else { 1.0 },
                transition: None,
            })
        });
        let moving = Phase::new(FRAME_MS, move |m: &Motion| match m.mode {
            AnimationMode::Show => None,
            AnimationMode::Hide => m.previous.map(|from| NodeVisual {
                y: from.y,
                height: from.height,
                opacity: 0.0,
                transition: Some(transition),
            }),
            _ => m.current.map(|to| NodeVisual {
                y: to.y,
                height: to.height,
                opacity: 1.0,
                transition: Some(transition),
            }),
        });
        let reveal = Phase::new(FRAME_MS + duration_ms, move |m: &Motion| {
            if m.mode != AnimationMode::Show {
                return None;
            }
            m.current.map(|to| NodeVisual {
                y: to.y,
                height: to.height,
                opacity: 1.0,
                transition: Some(transition),
            })
        });
        Self {
            phases: vec![first, moving, reveal],
            settle_ms: duration_ms,
            short_circuit_threshold: 0,
        }
    }

    pub fn with_phases(mut self, phases: Vec<Phase>) -> Self {
        self.phases = phases;
        self
    }

    pub fn with_settle_ms(mut self, settle_ms: u64) -> Self {
        self.settle_ms = settle_ms;
        self
    }

    pub fn with_short_circuit_threshold(mut self, threshold: u32) -> Self {
        self.short_circuit_threshold = threshold;
        self
    }

    /// Delay after which the sequence finishes.
    pub fn total_ms(&self) -> u64 {
        let last = self.phases.iter().map(|p| p.delay_ms).max().unwrap_or(0);
        last.saturating_add(self.settle_ms)
    }
}

#[derive(Debug)]
struct Scheduled<N> {
    node: N,
    motion: Motion,
    short_circuited: bool,
}

/// Applies phases to a running reconciliation and cleans up after it.
#[derive(Debug)]
pub(crate) struct PhaseScheduler<N> {
    items: Vec<Scheduled<N>>,
    phases: Vec<Phase>,
    next_phase: usize,
    timers: Vec<TimerId>,
}

impl<N: Copy> PhaseScheduler<N> {
    pub(crate) fn new<K>(items: &[AnimationItem<N, K>], options: &AnimationOptions) -> Self {
        let mut phases = options.phases.clone();
        phases.sort_by_key(|p| p.delay_ms);
        Self {
            items: items
                .iter()
                .map(|item| Scheduled {
                    node: item.node,
                    motion: item.motion,
                    short_circuited: item.short_circuited,
                })
                .collect(),
            phases,
            next_phase: 0,
            timers: Vec::new(),
        }
    }

    pub(crate) fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub(crate) fn set_timers(&mut self, timers: Vec<TimerId>) {
        self.timers = timers;
    }

    pub(crate) fn take_timers(&mut self) -> Vec<TimerId> {
        core::mem::take(&mut self.timers)
    }

    /// Applies the leading zero-delay phases; returns how many were applied.
    pub(crate) fn apply_immediate<S: RenderSurface<Node = N>>(&mut self, surface: &mut S) -> usize {
        let immediate = self.phases.iter().take_while(|p| p.delay_ms == 0).count();
        for phase in 0..immediate {
            self.apply(phase, surface);
        }
        immediate
    }

    /// Applies `phase` unless a later one already ran.
    pub(crate) fn apply<S: RenderSurface<Node = N>>(&mut self, phase: usize, surface: &mut S) {
        let Some(p) = self.phases.get(phase) else {
            return;
        };
        if phase < self.next_phase {
            return;
        }
        vtrace!(phase, delay_ms = p.delay_ms, "animation phase");
        for item in self.items.iter().filter(|i| !i.short_circuited) {
            if let Some(visual) = (p.visual)(&item.motion) {
                surface.set_visual(item.node, &visual);
            }
        }
        self.next_phase = phase + 1;
    }

    /// Jumps to the terminal phase.
    pub(crate) fn fast_forward<S: RenderSurface<Node = N>>(&mut self, surface: &mut S) {
        if self.next_phase < self.phases.len() {
            self.apply(self.phases.len() - 1, surface);
        }
    }

    /// Clears visuals and returns the nodes that leave.
    pub(crate) fn finish<S: RenderSurface<Node = N>>(self, surface: &mut S) -> Vec<N> {
        let mut leaving = Vec::new();
        for item in self.items {
            if item.motion.mode.is_leaving() {
                leaving.push(item.node);
            } else {
                surface.clear_visual(item.node);
            }
        }
        leaving
    }
}

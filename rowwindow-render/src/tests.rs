use crate::*;

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};
use std::collections::{HashMap, HashSet};

use rowwindow::{ExceptionContext, Padding, ScrollDirection, ScrollResult};

#[derive(Clone, Copy, Debug)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        // Deterministic, dependency-free PRNG for tests.
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0
    }

    fn gen_range_u64(&mut self, start: u64, end_exclusive: u64) -> u64 {
        debug_assert!(start < end_exclusive);
        start + (self.next_u64() % (end_exclusive - start))
    }

    fn gen_range_u32(&mut self, start: u32, end_exclusive: u32) -> u32 {
        self.gen_range_u64(start as u64, end_exclusive as u64) as u32
    }
}

/// Records what the renderer does to it.
#[derive(Clone, Debug, Default, PartialEq)]
struct TestSurface {
    children: Vec<u32>,
    metrics: ScrollMetrics,
    content_offset: u64,
    sizer: u64,
    heights: HashMap<u32, u32>,
    loading: HashSet<u32>,
    visuals: HashMap<u32, NodeVisual>,
    header: Option<u32>,
    hints: Vec<bool>,
    disposed: Vec<u32>,
    removes: usize,
}

impl TestSurface {
    fn with_viewport(viewport: u32) -> Self {
        Self {
            metrics: ScrollMetrics {
                offset: 0,
                viewport,
            },
            ..Self::default()
        }
    }
}

impl RenderSurface for TestSurface {
    type Node = u32;

    fn append(&mut self, node: u32) {
        self.children.retain(|n| *n != node);
        self.children.push(node);
    }

    fn insert_before(&mut self, node: u32, anchor: u32) {
        self.children.retain(|n| *n != node);
        let at = self
            .children
            .iter()
            .position(|n| *n == anchor)
            .expect("anchor is attached");
        self.children.insert(at, node);
    }

    fn remove(&mut self, node: u32) {
        let before = self.children.len();
        self.children.retain(|n| *n != node);
        assert_eq!(self.children.len() + 1, before, "removed node {node} was attached");
        self.removes += 1;
    }

    fn scroll_metrics(&self) -> ScrollMetrics {
        self.metrics
    }

    fn set_content_offset(&mut self, y: u64) {
        self.content_offset = y;
    }

    fn set_sizer_extent(&mut self, total_height: u64) {
        self.sizer = total_height;
    }

    fn set_row_height(&mut self, node: u32, height: Option<u32>) {
        match height {
            Some(h) => self.heights.insert(node, h),
            None => self.heights.remove(&node),
        };
    }

    fn set_loading(&mut self, node: u32, loading: bool) {
        if loading {
            self.loading.insert(node);
        } else {
            self.loading.remove(&node);
        }
    }

    fn set_visual(&mut self, node: u32, visual: &NodeVisual) {
        self.visuals.insert(node, *visual);
    }

    fn clear_visual(&mut self, node: u32) {
        self.visuals.remove(&node);
    }

    fn set_header(&mut self, header: Option<u32>) {
        self.header = header;
    }

    fn set_scrolling_hint(&mut self, scrolling: bool) {
        self.hints.push(scrolling);
    }

    fn dispose(&mut self, node: u32) {
        self.disposed.push(node);
    }
}

/// Numbers nodes sequentially and remembers which row each is bound to.
#[derive(Debug, Default)]
struct Rows {
    next_node: u32,
    bound: HashMap<u32, usize>,
    updated: usize,
    async_rows: bool,
    resolvers: Vec<(usize, Resolver<u32>)>,
    with_header: bool,
    header_updates: usize,
}

impl Rows {
    fn fresh(&mut self) -> u32 {
        let node = self.next_node;
        self.next_node += 1;
        node
    }

    fn output(&mut self, node: u32, index: usize) -> ItemOutput<u32> {
        self.bound.insert(node, index);
        if !self.async_rows {
            return ItemOutput::Ready(node);
        }
        let (resolver, ready) = deferred();
        self.resolvers.push((index, resolver));
        ItemOutput::Loading {
            placeholder: node,
            ready,
        }
    }

    fn take_resolver(&mut self, index: usize) -> Resolver<u32> {
        let at = self
            .resolvers
            .iter()
            .position(|(i, _)| *i == index)
            .expect("resolver for row");
        self.resolvers.remove(at).1
    }
}

impl ItemFactory<u32> for Rows {
    fn create(&mut self, index: usize) -> ItemOutput<u32> {
        let node = self.fresh();
        self.output(node, index)
    }

    fn update(&mut self, node: u32, index: usize) -> ItemOutput<u32> {
        self.updated += 1;
        self.output(node, index)
    }

    fn create_header(&mut self) -> Option<u32> {
        if self.with_header {
            Some(self.fresh())
        } else {
            None
        }
    }

    fn update_header(&mut self, _header: u32) {
        self.header_updates += 1;
    }
}

type TestRenderer = Renderer<TestSurface, Rows>;

fn uniform(rows: usize) -> ExceptionContext {
    ExceptionContext::uniform(rows, 20, Padding::none())
}

fn renderer_with(rows: Rows, context: ExceptionContext, options: RendererOptions) -> TestRenderer {
    Renderer::new(TestSurface::with_viewport(100), rows, context, options)
}

fn renderer(rows: usize) -> TestRenderer {
    renderer_with(Rows::default(), uniform(rows), RendererOptions::new())
}

fn scroll_to(r: &mut TestRenderer, offset: u64, now_ms: u64) -> ScrollResult {
    let prev = r.scroll_state().offset;
    r.surface_mut().metrics.offset = offset;
    let viewport = r.surface().metrics.viewport;
    r.on_scrolled(offset, viewport, ScrollDirection::between(prev, offset), now_ms)
}

fn assert_consistent(r: &TestRenderer) {
    let live = r.live_nodes();
    let indexes: Vec<usize> = live.iter().map(|(i, _)| *i).collect();
    assert_eq!(indexes, r.window().range().collect::<Vec<_>>());
    let nodes: Vec<u32> = live.iter().map(|(_, n)| *n).collect();
    assert_eq!(r.surface().children, nodes);
    for (index, node) in &live {
        assert_eq!(r.factory().bound.get(node), Some(index));
    }
}

#[test]
fn initial_render_materializes_exact_window() {
    let mut r = renderer(1000);
    assert_eq!(r.render(0), ScrollResult::All);
    assert_eq!(r.window().range(), 0..5);
    assert_eq!(r.window().forced(), 0..5);
    assert_consistent(&r);
    assert_eq!(r.surface().sizer, 20_000);
    assert_eq!(r.surface().content_offset, 0);
    assert_eq!(r.pool_stats().created, 5);
    assert!(!r.scroll_state().is_scrolling);
}

#[test]
fn small_scroll_grows_by_batch_and_keeps_top_slack() {
    let mut r = renderer(1000);
    r.render(0);

    assert_eq!(scroll_to(&mut r, 30, 1), ScrollResult::SomeBottom);
    assert_eq!(r.window().range(), 0..10);
    assert_eq!(r.window().forced(), 1..7);
    assert_consistent(&r);
    assert_eq!(r.surface().removes, 0);
}

#[test]
fn jump_scroll_rebuilds_once() {
    let mut r = renderer(10_000);
    r.render(0);
    assert_eq!(r.surface().removes, 0);

    assert_eq!(scroll_to(&mut r, 500, 1), ScrollResult::All);
    assert_eq!(r.window().range(), 25..30);
    assert_eq!(r.surface().removes, 5);
    assert_eq!(r.surface().content_offset, 500);
    assert_consistent(&r);

    let stats = r.pool_stats();
    assert_eq!(stats.created, 5);
    assert_eq!(stats.reused, 5);
    assert_eq!(stats.recycled, 5);
    assert_eq!((stats.live, stats.pooled), (5, 0));
}

#[test]
fn scrolling_back_adds_rows_at_top() {
    let mut r = renderer(1000);
    r.render(0);
    assert_eq!(scroll_to(&mut r, 200, 1), ScrollResult::All);
    assert_eq!(r.window().range(), 10..15);

    assert_eq!(scroll_to(&mut r, 180, 2), ScrollResult::SomeTop);
    assert_eq!(r.window().range(), 5..15);
    assert_eq!(r.window().forced(), 9..14);
    assert_eq!(r.surface().content_offset, 100);
    assert_consistent(&r);
}

#[test]
fn covered_viewport_changes_nothing() {
    let mut r = renderer(1000);
    r.render(0);
    let before = r.surface().clone();

    assert_eq!(r.on_scrolled(10, 80, ScrollDirection::Forward, 1), ScrollResult::None);
    assert_eq!(r.window().range(), 0..5);
    assert_eq!(r.window().forced(), 0..5);
    assert_eq!(r.surface().children, before.children);
    assert_eq!(r.surface().removes, before.removes);
}

#[test]
fn empty_rows_render_nothing() {
    let mut r = renderer(0);
    assert_eq!(r.render(0), ScrollResult::None);
    assert!(r.window().is_empty());
    assert!(r.surface().children.is_empty());
    assert_eq!(r.surface().sizer, 0);
}

#[test]
fn forward_scrolls_never_move_window_start_back() {
    let mut rng = Lcg::new(11);
    let heights: Vec<u32> = (0..500)
        .map(|_| {
            if rng.gen_range_u32(0, 5) == 0 {
                rng.gen_range_u32(5, 90)
            } else {
                24
            }
        })
        .collect();
    let context = ExceptionContext::from_heights(&heights, None, Padding::none());
    let total = context.total_height();
    let mut r = renderer_with(Rows::default(), context, RendererOptions::new());
    r.surface_mut().metrics.viewport = 300;
    r.render(0);

    let mut offset = 0u64;
    let mut last_start = r.window().start;
    let mut now = 0u64;
    while offset < total {
        offset += rng.gen_range_u64(1, 400);
        now += 16;
        scroll_to(&mut r, offset, now);
        assert!(r.window().start >= last_start, "offset {offset}");
        last_start = r.window().start;
        assert_consistent(&r);
    }
}

#[test]
fn random_scrolling_conserves_pool() {
    let rows = 300;
    let mut rng = Lcg::new(3);
    let mut r = renderer_with(
        Rows::default(),
        uniform(rows),
        RendererOptions::new().with_batch_size(4),
    );
    r.render(0);

    for step in 0..500u64 {
        let offset = if rng.gen_range_u32(0, 3) == 0 {
            rng.gen_range_u64(0, 6000)
        } else {
            let delta = rng.gen_range_u64(0, 120);
            let cur = r.scroll_state().offset;
            if rng.gen_range_u32(0, 2) == 0 {
                cur.saturating_sub(delta)
            } else {
                (cur + delta).min(5900)
            }
        };
        scroll_to(&mut r, offset, step * 16);
        assert_consistent(&r);

        let stats = r.pool_stats();
        assert!(stats.created <= rows);
        assert_eq!(stats.live + stats.pooled, stats.created);
    }
}

#[test]
fn loading_placeholder_is_swapped_on_resolve() {
    let rows = Rows {
        async_rows: true,
        ..Rows::default()
    };
    let mut r = renderer_with(rows, uniform(100), RendererOptions::new());
    r.render(0);
    assert_eq!(r.surface().loading.len(), 5);
    let placeholder = r.live_nodes()[0].1;

    assert!(r.factory_mut().take_resolver(0).resolve(500));
    assert!(r.factory_mut().take_resolver(1).resolve(r.live_nodes()[1].1));
    let report = r.poll_loading();
    assert_eq!(report.resolved, vec![0, 1]);
    assert!(report.failed.is_empty());

    assert_eq!(r.surface().children[0], 500);
    assert!(!r.surface().children.contains(&placeholder));
    assert_eq!(r.surface().loading.len(), 3);
    assert_eq!(r.pool_stats().pooled, 1);
    assert!(r.poll_loading().is_empty());
}

#[test]
fn failed_items_are_reported() {
    let rows = Rows {
        async_rows: true,
        ..Rows::default()
    };
    let mut r = renderer_with(rows, uniform(100), RendererOptions::new());
    r.render(0);

    assert!(r.factory_mut().take_resolver(2).reject("boom"));
    drop(r.factory_mut().take_resolver(3));
    let report = r.poll_loading();
    assert!(report.resolved.is_empty());
    assert_eq!(
        report.failed,
        vec![
            (2, ItemError::Failed(String::from("boom"))),
            (3, ItemError::Dropped)
        ]
    );
    assert_eq!(r.surface().loading.len(), 3);
    assert_consistent(&r);
}

#[test]
fn late_resolve_after_recycle_leaves_pooled_node_alone() {
    let rows = Rows {
        async_rows: true,
        ..Rows::default()
    };
    let mut r = renderer_with(rows, uniform(10_000), RendererOptions::new());
    r.render(0);
    let old_nodes: Vec<u32> = r.live_nodes().iter().map(|(_, n)| *n).collect();

    assert_eq!(scroll_to(&mut r, 500, 1), ScrollResult::All);
    assert_eq!(r.pool_stats().aborted, 5);

    let before = r.surface().clone();
    let late = r.factory_mut().take_resolver(0);
    assert!(late.is_aborted());
    assert!(!late.resolve(777));

    assert!(r.poll_loading().is_empty());
    assert_eq!(*r.surface(), before);
    assert!(!r.surface().children.contains(&777));
    for node in old_nodes {
        assert_ne!(r.factory().bound.get(&node), Some(&0));
    }
    assert_consistent(&r);
}

#[test]
fn recycling_an_unpolled_resolved_row_clears_loading() {
    let rows = Rows {
        async_rows: true,
        ..Rows::default()
    };
    let mut r = renderer_with(rows, uniform(10_000), RendererOptions::new());
    r.render(0);
    assert_eq!(r.surface().loading.len(), 5);
    assert!(r.factory_mut().take_resolver(0).resolve(900));

    // The next rows bind synchronously, so nothing sets the loading flag again.
    r.factory_mut().async_rows = false;
    assert_eq!(scroll_to(&mut r, 500, 1), ScrollResult::All);

    assert!(r.surface().loading.is_empty());
    assert_eq!(r.surface().disposed, vec![900]);
    assert!(!r.surface().children.contains(&900));
    let stats = r.pool_stats();
    assert_eq!((stats.aborted, stats.reused), (4, 5));
    assert!(r.poll_loading().is_empty());
    assert_consistent(&r);
}

#[test]
fn rebinding_an_unpolled_resolved_row_clears_loading() {
    let rows = Rows {
        async_rows: true,
        ..Rows::default()
    };
    let mut r = renderer_with(rows, uniform(100), RendererOptions::new());
    r.render(0);
    assert!(r.factory_mut().take_resolver(1).resolve(901));

    r.factory_mut().async_rows = false;
    r.refresh_rows(0..5);

    assert!(r.surface().loading.is_empty());
    assert_eq!(r.surface().disposed, vec![901]);
    assert_eq!(r.surface().children, vec![0, 1, 2, 3, 4]);
    assert_eq!(r.pool_stats().aborted, 4);
    assert!(r.poll_loading().is_empty());
    assert_consistent(&r);
}

fn prefetch_options() -> RendererOptions {
    RendererOptions::new().with_mixin(prefetch(
        PrefetchOptions::new()
            .with_prefetch_rows(10)
            .with_prefetch_delay_ms(20)
            .with_clean_up_rows(2)
            .with_clean_up_delay_ms(100),
    ))
}

#[test]
fn prefetch_extends_then_clean_up_trims() {
    let mut r = renderer_with(Rows::default(), uniform(1000), prefetch_options());
    assert_eq!(r.mixin_names(), vec!["prefetch"]);
    r.render(0);
    assert_eq!(r.next_due(), Some(20));

    r.tick(19);
    assert_eq!(r.window().range(), 0..5);
    r.tick(20);
    assert_eq!(r.window().range(), 0..15);
    assert_consistent(&r);

    assert_eq!(
        r.on_scrolled(0, 100, ScrollDirection::Forward, 30),
        ScrollResult::None
    );
    r.tick(129);
    assert_eq!(r.window().range(), 0..15);
    r.tick(130);
    assert_eq!(r.window().range(), 0..7);
    assert_consistent(&r);
}

#[test]
fn new_scroll_cancels_pending_prefetch() {
    let mut r = renderer_with(Rows::default(), uniform(1000), prefetch_options());
    r.render(0);

    assert_eq!(scroll_to(&mut r, 20, 10), ScrollResult::SomeBottom);
    assert_eq!(r.window().range(), 0..10);
    r.tick(25);
    assert_eq!(r.window().range(), 0..10);
    r.tick(30);
    assert_eq!(r.window().range(), 0..16);
    assert_consistent(&r);
}

#[test]
fn prefetch_follows_backward_travel() {
    let mut r = renderer_with(Rows::default(), uniform(1000), prefetch_options());
    r.render(0);
    r.surface_mut().metrics.offset = 2000;
    assert_eq!(
        r.on_scrolled(2000, 100, ScrollDirection::Backward, 0),
        ScrollResult::All
    );
    r.tick(20);
    assert_eq!(r.window().range(), 90..105);
    assert_consistent(&r);
}

#[test]
fn dispatcher_sync_delivery_respects_min_delta() {
    let mut hub = ScrollHub::<&'static str>::new();
    let id = hub.subscribe("list", ScrollDelivery::Sync, 5);

    let first = hub.on_scroll(&"list", 0, 0);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].subscription, id);
    assert!(hub.on_scroll(&"list", 3, 1).is_empty());

    let forward = hub.on_scroll(&"list", 8, 2);
    assert_eq!(forward[0].offset, 8);
    assert_eq!(forward[0].direction, ScrollDirection::Forward);

    let back = hub.on_scroll(&"list", 2, 3);
    assert_eq!(back[0].direction, ScrollDirection::Backward);
    assert!(hub.on_scroll(&"other", 100, 4).is_empty());
}

#[test]
fn dispatcher_debounce_and_frame_delivery() {
    let mut hub = ScrollHub::<u32>::new();
    let debounced = hub.subscribe(1, ScrollDelivery::Debounce { delay_ms: 50 }, 0);
    let framed = hub.subscribe(1, ScrollDelivery::AnimationFrame, 0);

    for (offset, now) in [(10, 0), (20, 10), (30, 20)] {
        assert!(hub.on_scroll(&1, offset, now).is_empty());
    }
    assert_eq!(hub.dispatcher(&1).and_then(ScrollDispatcher::next_due), Some(70));
    assert!(hub.tick(60).is_empty());

    let settled = hub.tick(70);
    assert_eq!(settled.len(), 1);
    assert_eq!((settled[0].subscription, settled[0].offset), (debounced, 30));
    assert!(hub.tick(200).is_empty());

    let frame = hub.on_animation_frame(&1);
    assert_eq!(frame.len(), 1);
    assert_eq!((frame[0].subscription, frame[0].offset), (framed, 30));
    assert!(hub.on_animation_frame(&1).is_empty());
}

#[test]
fn hub_creates_and_drops_dispatchers_with_subscriptions() {
    let mut hub = ScrollHub::<u32>::new();
    let a = hub.subscribe(1, ScrollDelivery::Sync, 0);
    let b = hub.subscribe(1, ScrollDelivery::AnimationFrame, 0);
    let c = hub.subscribe(2, ScrollDelivery::Sync, 0);
    assert_eq!(hub.len(), 2);
    assert_eq!(hub.dispatcher(&1).map(ScrollDispatcher::len), Some(2));

    assert!(hub.unsubscribe(a));
    assert_eq!(hub.len(), 2);
    assert!(hub.unsubscribe(b));
    assert!(hub.dispatcher(&1).is_none());
    assert!(!hub.unsubscribe(b));
    assert!(hub.unsubscribe(c));
    assert!(hub.is_empty());
}

#[test]
fn renderer_reacts_to_hub_deliveries() {
    let mut hub = ScrollHub::<u32>::new();
    let mut r = renderer(1000);
    r.render(0);
    let id = r.attach(&mut hub, 7);
    assert_eq!(r.subscription(), Some(id));
    let other = hub.subscribe(7, ScrollDelivery::Sync, 0);

    r.surface_mut().metrics.offset = 400;
    let deliveries = hub.on_scroll(&7, 400, 1);
    assert_eq!(deliveries.len(), 2);
    for d in &deliveries {
        let result = r.deliver(d, 1);
        if d.subscription == other {
            assert_eq!(result, None);
        } else {
            assert_eq!(result, Some(ScrollResult::All));
        }
    }
    assert_eq!(r.window().range(), 20..25);

    assert!(r.detach(&mut hub));
    assert_eq!(hub.len(), 1);
    assert!(hub.unsubscribe(other));
    assert!(hub.is_empty());
}

fn flip() -> AnimationOptions {
    AnimationOptions::flip(100, Easing::Linear)
}

#[test]
fn animated_insert_moves_rows_and_removes_leavers() {
    let mut r = renderer(100);
    r.render(0);
    let items = r.replace_context_animated(
        uniform(102),
        |i| i as u64,
        |i| if i < 2 { 1000 + i as u64 } else { i as u64 - 2 },
        &flip(),
        0,
    );

    let modes: Vec<(AnimationMode, u32)> = items.iter().map(|i| (i.motion.mode, i.node)).collect();
    assert_eq!(
        modes,
        vec![
            (AnimationMode::Show, 5),
            (AnimationMode::Show, 6),
            (AnimationMode::Update, 0),
            (AnimationMode::Update, 1),
            (AnimationMode::Update, 2),
            (AnimationMode::UpdateRemove, 3),
            (AnimationMode::UpdateRemove, 4),
        ]
    );
    assert_eq!(items[5].motion.current.map(|g| g.y), Some(100));
    assert!(r.is_animating());

    // First phase lands before new nodes are attached; shown rows start transparent.
    assert_eq!(r.surface().visuals[&5].opacity, 0.0);
    assert_eq!(r.surface().visuals[&0].y, 0);
    assert_eq!(r.surface().children, vec![3, 4, 5, 6, 0, 1, 2]);

    r.tick(FRAME_MS);
    assert_eq!(r.surface().visuals[&0].y, 40);
    assert!(r.surface().visuals[&0].transition.is_some());
    assert_eq!(r.surface().visuals[&3].y, 100);
    assert_eq!(r.surface().visuals[&5].opacity, 0.0);

    r.tick(FRAME_MS + 100);
    assert_eq!(r.surface().visuals[&5].opacity, 1.0);

    r.tick(flip().total_ms());
    assert!(!r.is_animating());
    assert!(r.surface().visuals.is_empty());
    assert_eq!(r.surface().children, vec![5, 6, 0, 1, 2]);
    assert_eq!(r.pool_stats().pooled, 2);
    assert_consistent(&r);
}

#[test]
fn scroll_during_animation_cleans_up_like_completion() {
    let mut r = renderer(100);
    r.render(0);
    r.replace_context_animated(
        uniform(102),
        |i| i as u64,
        |i| if i < 2 { 1000 + i as u64 } else { i as u64 - 2 },
        &flip(),
        0,
    );
    assert!(r.is_animating());
    assert!(!r.surface().visuals.is_empty());

    assert_eq!(scroll_to(&mut r, 40, 5), ScrollResult::SomeBottom);
    assert!(!r.is_animating());
    assert!(r.surface().visuals.is_empty());

    // Leavers 3 and 4 went back to the pool and were reused for rows 5 and 6.
    assert_eq!(r.window().range(), 0..10);
    assert_eq!(r.surface().children, vec![5, 6, 0, 1, 2, 4, 3, 7, 8, 9]);
    let stats = r.pool_stats();
    assert_eq!((stats.recycled, stats.reused, stats.pooled), (2, 2, 0));
    assert_consistent(&r);

    // Cancelled phases never fire.
    r.tick(flip().total_ms());
    assert!(r.surface().visuals.is_empty());
    assert_eq!(r.surface().children, vec![5, 6, 0, 1, 2, 4, 3, 7, 8, 9]);
    assert_consistent(&r);
}

#[test]
fn animated_delete_hides_row_and_creates_moved_in_row() {
    let mut r = renderer(100);
    r.render(0);
    let items = r.replace_context_animated(
        uniform(99),
        |i| i as u64,
        |i| if i < 1 { i as u64 } else { i as u64 + 1 },
        &flip(),
        0,
    );

    let modes: Vec<(AnimationMode, u32, bool)> = items
        .iter()
        .map(|i| (i.motion.mode, i.node, i.short_circuited))
        .collect();
    assert_eq!(
        modes,
        vec![
            (AnimationMode::Update, 0, true),
            (AnimationMode::Update, 2, false),
            (AnimationMode::Update, 3, false),
            (AnimationMode::Update, 4, false),
            (AnimationMode::UpdateCreate, 5, false),
            (AnimationMode::Hide, 1, false),
        ]
    );
    let created = &items[4].motion;
    assert_eq!(created.previous.map(|g| (g.index, g.y)), Some((5, 100)));
    assert_eq!(created.current.map(|g| (g.index, g.y)), Some((4, 80)));
    assert!(!r.surface().visuals.contains_key(&0));

    // A scroll fast-forwards the animation and recycles the hidden row.
    assert_eq!(
        r.on_scrolled(0, 100, ScrollDirection::Forward, 5),
        ScrollResult::None
    );
    assert!(!r.is_animating());
    assert!(r.surface().visuals.is_empty());
    assert_eq!(r.pool_stats().pooled, 1);
    assert_consistent(&r);
}

#[test]
fn abort_animation_reports_whether_one_ran() {
    let mut r = renderer(100);
    r.render(0);
    assert!(!r.abort_animation());
    r.replace_context_animated(uniform(100), |i| i, |i| 99 - i, &flip(), 0);
    assert!(r.abort_animation());
    assert!(!r.is_animating());
    assert_eq!(r.next_due(), None);
    assert_consistent(&r);
}

#[test]
fn reconcile_plan_lists_every_live_row_once() {
    let mut rng = Lcg::new(5);
    let old = uniform(50);
    for _ in 0..50 {
        let mut keys: Vec<u64> = (0..80).collect();
        for i in (1..keys.len()).rev() {
            let j = rng.gen_range_u64(0, i as u64 + 1) as usize;
            keys.swap(i, j);
        }
        let rows = rng.gen_range_u64(0, 80) as usize;
        keys.truncate(rows);
        let next = uniform(rows);
        let start = rng.gen_range_u64(0, 45) as usize;
        let live: Vec<usize> = (start..start + 5).collect();
        let range = next.resolve_range(rng.gen_range_u64(0, 1600), 100);

        let plan = plan_reconcile(&old, &next, &live, range, |i| i as u64, |i| keys[i], 0);
        for at in 0..live.len() {
            let hits = plan.entries.iter().filter(|e| e.live == Some(at)).count();
            assert_eq!(hits, 1);
        }
        let entering = plan.entries.iter().filter(|e| !e.motion.mode.is_leaving()).count();
        assert_eq!(entering, range.len());
    }
}

#[test]
fn plain_replace_drops_the_pool() {
    let rows = Rows {
        with_header: true,
        ..Rows::default()
    };
    let mut r = renderer_with(rows, uniform(100), RendererOptions::new());
    r.render(0);
    let header = r.header();
    assert!(header.is_some());
    assert_eq!(r.surface().header, header);

    assert_eq!(r.replace_context(uniform(50), 1), ScrollResult::All);
    assert_eq!(r.surface().disposed.len(), 5);
    assert_eq!(r.factory().header_updates, 1);
    let stats = r.pool_stats();
    assert_eq!((stats.created, stats.reused, stats.pooled), (10, 0, 0));
    assert_eq!(r.surface().sizer, 1000);
    assert_consistent(&r);

    let (surface, rows) = r.destroy();
    assert!(surface.children.is_empty());
    assert_eq!(surface.header, None);
    assert_eq!(surface.disposed.len(), 11);
    assert!(header.is_some_and(|h| surface.disposed.contains(&h)));
    assert_eq!(rows.header_updates, 1);
}

#[test]
fn scrolling_hint_resets_after_quiet_period() {
    let mut r = renderer_with(
        Rows::default(),
        uniform(1000),
        RendererOptions::new().with_scrolling_hint(true),
    );
    r.render(0);
    assert!(r.surface().hints.is_empty());

    scroll_to(&mut r, 40, 10);
    assert!(r.scroll_state().is_scrolling);
    scroll_to(&mut r, 60, 100);
    assert_eq!(r.surface().hints, vec![true]);

    r.tick(200);
    assert!(r.scroll_state().is_scrolling);
    assert_eq!(r.tick(250), None);
    assert_eq!(r.surface().hints, vec![true, false]);
    assert!(!r.scroll_state().is_scrolling);
}

#[test]
fn refresh_rebinds_only_live_rows_in_range() {
    let mut r = renderer(100);
    r.render(0);
    r.refresh_rows(3..10);
    assert_eq!(r.factory().updated, 2);
    assert_consistent(&r);
}

#[test]
fn exception_rows_get_height_overrides() {
    let context =
        ExceptionContext::from_heights(&[20, 20, 30, 20, 20, 20, 20], None, Padding::none());
    let mut r = renderer_with(Rows::default(), context, RendererOptions::new());
    r.render(0);
    let node = r.live_nodes()[2].1;
    assert_eq!(r.surface().heights.get(&node), Some(&30));
    assert_eq!(r.surface().heights.len(), 1);
    assert_eq!(r.surface().sizer, 150);
}

#[test]
fn deferred_map_propagates_abort() {
    let (resolver, source) = deferred::<u32>();
    let mut mapped = source.map(|v| v * 2);
    assert!(!mapped.is_settled());
    assert!(mapped.abort());
    assert!(!mapped.abort());
    assert!(resolver.is_aborted());
    assert!(!resolver.resolve(1));
    assert_eq!(mapped.try_take(), Some(Settled::Aborted));
}

#[test]
fn deferred_map_transforms_value_once() {
    let (resolver, source) = deferred::<u32>();
    let mut mapped = source.map(|v| v * 2);
    assert_eq!(mapped.try_take(), None);
    assert!(resolver.resolve(21));
    assert_eq!(mapped.try_take(), Some(Settled::Ready(42)));
    assert_eq!(mapped.try_take(), None);

    assert_eq!(Deferred::ready(3).try_take(), Some(Settled::Ready(3)));
}

#[test]
fn deferred_polls_as_future() {
    let mut cx = Context::from_waker(futures_task::noop_waker_ref());
    let (resolver, mut ready) = deferred::<u32>();
    assert_eq!(Pin::new(&mut ready).poll(&mut cx), Poll::Pending);
    assert!(resolver.resolve(5));
    assert_eq!(
        Pin::new(&mut ready).poll(&mut cx),
        Poll::Ready(Settled::Ready(5))
    );

    let (resolver, mut dropped) = deferred::<u32>();
    drop(resolver);
    assert_eq!(
        Pin::new(&mut dropped).poll(&mut cx),
        Poll::Ready(Settled::Failed(ItemError::Dropped))
    );
}

#[test]
fn easing_and_transition_progress() {
    assert_eq!(Easing::Linear.sample(0.25), 0.25);
    assert_eq!(Easing::SmoothStep.sample(0.5), 0.5);
    assert_eq!(Easing::EaseInOutCubic.sample(1.0), 1.0);

    let t = Transition::new(100, Easing::Linear);
    assert_eq!(t.progress(50), 0.5);
    assert_eq!(t.progress(500), 1.0);
    assert_eq!(t.interpolate(10.0, 20.0, 50), 15.0);
    assert!(!t.is_done(99));
    assert!(t.is_done(100));
}

#[test]
fn timer_queue_pops_in_deadline_order() {
    let mut q = TimerQueue::new();
    let late = q.schedule(0, 30, "late");
    q.schedule(0, 10, "first");
    q.schedule(5, 5, "second");
    assert_eq!(q.next_due(), Some(10));
    assert!(q.pop_due(9).is_none());

    assert_eq!(q.pop_due(10).map(|(_, p)| p), Some("first"));
    assert_eq!(q.pop_due(10).map(|(_, p)| p), Some("second"));
    assert!(q.cancel(late));
    assert!(!q.cancel(late));
    assert!(q.is_empty());
}

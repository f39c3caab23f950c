use rowwindow::{ExceptionContext, Padding, ScrollDirection};
use rowwindow_render::{
    ItemFactory, ItemOutput, PrefetchOptions, RenderSurface, Renderer, RendererOptions,
    ScrollMetrics, prefetch,
};

// Example: drive a renderer against an in-memory surface and watch nodes get recycled.
#[derive(Default)]
struct Lines {
    children: Vec<u32>,
    offset: u64,
    viewport: u32,
}

impl RenderSurface for Lines {
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
            .unwrap_or(0);
        self.children.insert(at, node);
    }

    fn remove(&mut self, node: u32) {
        self.children.retain(|n| *n != node);
    }

    fn scroll_metrics(&self) -> ScrollMetrics {
        ScrollMetrics {
            offset: self.offset,
            viewport: self.viewport,
        }
    }

    fn set_content_offset(&mut self, _y: u64) {}

    fn set_sizer_extent(&mut self, _total_height: u64) {}
}

#[derive(Default)]
struct Labels {
    next: u32,
}

impl ItemFactory<u32> for Labels {
    fn create(&mut self, _index: usize) -> ItemOutput<u32> {
        self.next += 1;
        ItemOutput::Ready(self.next)
    }

    fn update(&mut self, node: u32, _index: usize) -> ItemOutput<u32> {
        ItemOutput::Ready(node)
    }
}

fn main() {
    let surface = Lines {
        viewport: 200,
        ..Lines::default()
    };
    let ctx = ExceptionContext::uniform(10_000, 20, Padding::none());
    let options = RendererOptions::new().with_mixin(prefetch(PrefetchOptions::new()));
    let mut r = Renderer::new(surface, Labels::default(), ctx, options);

    println!("render: {:?} window={:?}", r.render(0), r.window());
    let mut now = 0;
    for offset in (0..2_000).step_by(70) {
        now += 16;
        let result = r.on_scrolled(offset, 200, ScrollDirection::Forward, now);
        r.tick(now);
        println!("offset={offset} result={result:?} window={:?}", r.window().range());
    }
    println!("stats={:?}", r.pool_stats());
}

// Example: sparse height exceptions and range resolution.
use rowwindow::{ExceptionContext, Padding, VisibleWindow, plan_scroll};

fn main() {
    let mut heights = vec![20u32; 100_000];
    heights[3] = 64;
    heights[40_000] = 120;
    let ctx = ExceptionContext::from_heights(&heights, None, Padding::uniform(1));
    println!(
        "default_row_height={} exceptions={:?} total_height={}",
        ctx.default_row_height(),
        ctx.exceptions(),
        ctx.total_height()
    );

    let range = ctx.resolve_range(840_000, 300);
    println!("range={range:?}");

    let plan = plan_scroll(&VisibleWindow::EMPTY, &range, 5, ctx.number_of_rows());
    println!("result={:?} window={:?}", plan.result, plan.window);
}

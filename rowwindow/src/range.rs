use crate::{HeightException, VisibleRange};

/// Maps a scroll offset and viewport size to the minimal contiguous row window covering
/// `[scroll_offset, scroll_offset + viewport_size)`.
///
/// The result is clamped to `0..number_of_rows`: an offset past the end yields the last row, and
/// a zero-sized viewport still yields the row under `scroll_offset`. `exceptions` must be sorted
/// by index with `y` precomputed (as stored by [`crate::ExceptionContext`]).
///
/// Pure; safe to call on every scroll tick.
pub fn resolve_range(
    scroll_offset: u64,
    viewport_size: u32,
    default_row_height: u32,
    exceptions: &[HeightException],
    number_of_rows: usize,
) -> VisibleRange {
    if number_of_rows == 0 {
        return VisibleRange::EMPTY;
    }
    if number_of_rows == 1 {
        return VisibleRange {
            start_index: 0,
            end_index: 1,
            first_row_pos: 0,
            end_pos: row_height_in(0, default_row_height, exceptions) as u64,
        };
    }

    let scroll_end = scroll_offset.saturating_add(viewport_size as u64);
    let uniform = uniform_window(
        0,
        0,
        scroll_offset,
        scroll_end,
        default_row_height,
        number_of_rows,
    );

    let (Some(first_exception), Some(last_exception)) = (exceptions.first(), exceptions.last())
    else {
        return uniform;
    };

    // Rows before the first exception are laid out exactly like a uniform list.
    if uniform.end_index <= first_exception.index {
        return uniform;
    }

    // Entirely past the last exception: uniform again, shifted to its end.
    let tail_origin = last_exception.index + 1;
    if scroll_offset >= last_exception.y2() && tail_origin < number_of_rows {
        return uniform_window(
            last_exception.y2(),
            tail_origin,
            scroll_offset,
            scroll_end,
            default_row_height,
            number_of_rows,
        );
    }

    let (Some(start_index), Some(last_index)) = (
        index_at_offset_in(
            scroll_offset,
            default_row_height,
            exceptions,
            number_of_rows,
        ),
        index_at_offset_in(
            scroll_end.saturating_sub(1).max(scroll_offset),
            default_row_height,
            exceptions,
            number_of_rows,
        ),
    ) else {
        return VisibleRange::EMPTY;
    };

    let end_pos = row_top_in(last_index, default_row_height, exceptions)
        .saturating_add(row_height_in(last_index, default_row_height, exceptions) as u64);
    VisibleRange {
        start_index,
        end_index: last_index + 1,
        first_row_pos: row_top_in(start_index, default_row_height, exceptions),
        end_pos,
    }
}

/// Uniform-height window for rows `origin_index..number_of_rows` starting at `origin_y`.
fn uniform_window(
    origin_y: u64,
    origin_index: usize,
    scroll_offset: u64,
    scroll_end: u64,
    row_height: u32,
    number_of_rows: usize,
) -> VisibleRange {
    debug_assert!(row_height > 0, "row height must be > 0");
    debug_assert!(origin_index < number_of_rows);
    let step = row_height.max(1) as u64;

    let rel_start = scroll_offset.saturating_sub(origin_y);
    let start_index = origin_index
        .saturating_add((rel_start / step) as usize)
        .min(number_of_rows - 1);

    let rel_end = scroll_end.saturating_sub(origin_y);
    let end_index = origin_index
        .saturating_add(rel_end.div_ceil(step) as usize)
        .clamp(start_index + 1, number_of_rows);

    VisibleRange {
        start_index,
        end_index,
        first_row_pos: origin_y + (start_index - origin_index) as u64 * step,
        end_pos: origin_y + (end_index - origin_index) as u64 * step,
    }
}

/// Index of the row covering `offset` (clamped to the last row), or `None` for an empty list.
pub(crate) fn index_at_offset_in(
    offset: u64,
    default_row_height: u32,
    exceptions: &[HeightException],
    number_of_rows: usize,
) -> Option<usize> {
    if number_of_rows == 0 {
        return None;
    }
    let step = default_row_height.max(1) as u64;
    let last = number_of_rows - 1;

    // Last exception starting at or before `offset`; rows between it and the next exception
    // are uniform.
    let p = exceptions.partition_point(|e| e.y <= offset);
    let index = match p.checked_sub(1).map(|q| &exceptions[q]) {
        None => (offset / step) as usize,
        Some(e) if offset < e.y2() => e.index,
        Some(e) => e.index + 1 + ((offset - e.y2()) / step) as usize,
    };
    Some(index.min(last))
}

pub(crate) fn row_top_in(
    index: usize,
    default_row_height: u32,
    exceptions: &[HeightException],
) -> u64 {
    let step = default_row_height as u64;
    let p = exceptions.partition_point(|e| e.index < index);
    if let Some(e) = exceptions.get(p).filter(|e| e.index == index) {
        return e.y;
    }
    match p.checked_sub(1).map(|q| &exceptions[q]) {
        Some(prev) => prev
            .y2()
            .saturating_add((index - prev.index - 1) as u64 * step),
        None => index as u64 * step,
    }
}

fn row_height_in(index: usize, default_row_height: u32, exceptions: &[HeightException]) -> u32 {
    exceptions
        .binary_search_by_key(&index, |e| e.index)
        .map_or(default_row_height, |i| exceptions[i].height)
}

//! Shelf packing of flattened patches into a shared UV domain.

use nalgebra::{Point2, Vector2};
use tracing::debug;

use crate::patch::UvBounds;

/// Pack embeddings into rows of at most `row_width`, separated by `padding`.
///
/// Patches are placed in the order given (the pipeline's size order), each
/// translated so its bounding box sits on the current shelf. Returns the
/// overall bounds and the summed bounding-box area.
pub fn pack_patterns(
    embeddings: &mut [Vec<Point2<f64>>],
    row_width: f64,
    padding: f64,
) -> (UvBounds, f64) {
    let mut cursor_x = 0.0f64;
    let mut row_y = 0.0f64;
    let mut row_height = 0.0f64;
    let mut total_area = 0.0f64;
    let mut overall: Option<UvBounds> = None;

    for uv in embeddings.iter_mut() {
        let Some(bounds) = UvBounds::of(uv) else {
            continue;
        };
        let (w, h) = (bounds.width(), bounds.height());

        // Shelf break: the piece no longer fits on this row.
        if cursor_x > 0.0 && cursor_x + w > row_width {
            row_y += row_height + padding;
            cursor_x = 0.0;
            row_height = 0.0;
        }

        let offset = Vector2::new(cursor_x - bounds.u_min, row_y - bounds.v_min);
        for p in uv.iter_mut() {
            *p += offset;
        }

        let placed = UvBounds {
            u_min: cursor_x,
            u_max: cursor_x + w,
            v_min: row_y,
            v_max: row_y + h,
        };
        overall = Some(match overall {
            Some(prev) => prev.merge(&placed),
            None => placed,
        });
        total_area += placed.area();

        cursor_x += w + padding;
        row_height = row_height.max(h);
    }

    let bounds = overall.unwrap_or_else(UvBounds::zero);
    debug!(
        "Packed {} patterns into {:.3} × {:.3} (area {:.3})",
        embeddings.len(),
        bounds.width(),
        bounds.height(),
        total_area
    );

    (bounds, total_area)
}

//! On-screen placement of the editor popups.

use crate::model::Point;

/// Gap kept between a popup and the viewport edges.
pub const VIEWPORT_MARGIN: f32 = 20.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PopupKind {
    RoomEditor,
    TaskEditor,
}

impl PopupKind {
    pub fn size(self) -> Size {
        match self {
            PopupKind::RoomEditor => Size::new(320.0, 140.0),
            PopupKind::TaskEditor => Size::new(320.0, 180.0),
        }
    }

    /// How far above the anchor the popup's top edge sits.
    pub fn vertical_offset(self) -> f32 {
        match self {
            PopupKind::RoomEditor => 60.0,
            PopupKind::TaskEditor => 80.0,
        }
    }
}

/// `max(lo, min(v, hi))`; an inverted range resolves to `lo`.
pub fn clamp_to_range(v: f32, lo: f32, hi: f32) -> f32 {
    lo.max(v.min(hi))
}

/// Top-left corner for a popup of `size` anchored at `anchor`.
///
/// Without a viewport the anchor is returned as is.
pub fn place(anchor: Point, size: Size, vertical_offset: f32, viewport: Option<Size>) -> Point {
    let Some(viewport) = viewport else {
        return anchor;
    };
    let left = clamp_to_range(
        anchor.x - size.width / 2.0,
        VIEWPORT_MARGIN,
        viewport.width - size.width - VIEWPORT_MARGIN,
    );
    let top = clamp_to_range(
        anchor.y - vertical_offset,
        VIEWPORT_MARGIN,
        viewport.height - size.height - VIEWPORT_MARGIN,
    );
    Point::new(left, top)
}

pub fn place_popup(kind: PopupKind, anchor: Point, viewport: Option<Size>) -> Point {
    place(anchor, kind.size(), kind.vertical_offset(), viewport)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Size = Size::new(1000.0, 800.0);

    #[test]
    fn room_editor_hits_lower_bounds_at_origin() {
        let p = place_popup(PopupKind::RoomEditor, Point::new(0.0, 0.0), Some(VIEWPORT));
        assert_eq!(p, Point::new(20.0, 20.0));
    }

    #[test]
    fn room_editor_hits_upper_bounds_near_corner() {
        let p = place_popup(PopupKind::RoomEditor, Point::new(990.0, 790.0), Some(VIEWPORT));
        assert_eq!(p, Point::new(660.0, 640.0));
    }

    #[test]
    fn centered_anchor_is_offset_not_clamped() {
        let p = place_popup(PopupKind::RoomEditor, Point::new(500.0, 400.0), Some(VIEWPORT));
        assert_eq!(p, Point::new(340.0, 340.0));
        let p = place_popup(PopupKind::TaskEditor, Point::new(500.0, 400.0), Some(VIEWPORT));
        assert_eq!(p, Point::new(340.0, 320.0));
    }

    #[test]
    fn task_editor_bottom_bound_leaves_two_hundred_pixels() {
        let p = place_popup(PopupKind::TaskEditor, Point::new(500.0, 10_000.0), Some(VIEWPORT));
        assert_eq!(p.y, 800.0 - 200.0);
    }

    #[test]
    fn tiny_viewport_pins_to_margin() {
        let small = Size::new(200.0, 100.0);
        for anchor in [Point::new(0.0, 0.0), Point::new(150.0, 90.0), Point::new(-50.0, 500.0)] {
            let p = place_popup(PopupKind::RoomEditor, anchor, Some(small));
            assert_eq!(p, Point::new(20.0, 20.0));
        }
    }

    #[test]
    fn missing_viewport_returns_anchor() {
        let p = place_popup(PopupKind::TaskEditor, Point::new(-7.0, 12.5), None);
        assert_eq!(p, Point::new(-7.0, 12.5));
    }

    #[test]
    fn result_stays_inside_margins_when_it_fits() {
        let size = PopupKind::RoomEditor.size();
        for x in (-200..1200).step_by(97) {
            for y in (-200..1000).step_by(89) {
                let p = place_popup(PopupKind::RoomEditor, Point::new(x as f32, y as f32), Some(VIEWPORT));
                assert!(p.x >= 20.0 && p.x + size.width <= 980.0);
                assert!(p.y >= 20.0 && p.y + size.height <= 780.0);
            }
        }
    }
}

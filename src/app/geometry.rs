use eframe::egui;
use planmark::controller::Pointer;
use planmark::model::Point;
use planmark::placement::Size;

use super::View;

pub(super) fn to_pos(p: Point) -> egui::Pos2 {
    egui::pos2(p.x, p.y)
}

pub(super) fn to_point(p: egui::Pos2) -> Point {
    Point::new(p.x, p.y)
}

pub(super) fn viewport_size(rect: egui::Rect) -> Option<Size> {
    (rect.width() > 0.0 && rect.height() > 0.0).then(|| Size::new(rect.width(), rect.height()))
}

/// Pointer for the controller: image coordinates plus the screen position
/// relative to the viewport's top-left corner.
pub(super) fn pointer_at(view: &View, origin: egui::Pos2, viewport: egui::Rect, screen: egui::Pos2) -> Pointer {
    let image = view.screen_to_image(origin, screen);
    Pointer::new(to_point(image), to_point(screen - viewport.min.to_vec2()))
}

pub(super) fn image_points_to_screen(view: &View, origin: egui::Pos2, points: &[Point]) -> Vec<egui::Pos2> {
    points
        .iter()
        .map(|p| view.image_to_screen(origin, to_pos(*p)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_maps_through_pan_and_zoom() {
        let view = View {
            pan_screen: egui::vec2(10.0, 20.0),
            zoom: 2.0,
        };
        let viewport = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(800.0, 600.0));
        let origin = egui::pos2(100.0, 50.0);
        let pointer = pointer_at(&view, origin, viewport, egui::pos2(130.0, 90.0));
        assert_eq!(pointer.image, Point::new(10.0, 10.0));
        assert_eq!(pointer.screen, Point::new(130.0, 90.0));
        let back = view.image_to_screen(origin, to_pos(pointer.image));
        assert_eq!(back, egui::pos2(130.0, 90.0));
    }

    #[test]
    fn empty_rect_has_no_viewport() {
        assert!(viewport_size(egui::Rect::NOTHING).is_none());
        let size = viewport_size(egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(4.0, 3.0)));
        assert_eq!(size, Some(Size::new(4.0, 3.0)));
    }
}

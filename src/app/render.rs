use eframe::egui;
use planmark::controller::{ControllerState, DragTarget, Hover, Mode, Selection};
use planmark::geometry::polygon_centroid;
use planmark::model::{Point, TaskStatus};
use planmark::session::{BlueprintSession, SyncStatus};
use planmark::sync::EntityKey;

use super::geometry::{image_points_to_screen, to_pos};
use super::{BlueprintImage, Tool, View};

const ROOM_STROKE: egui::Color32 = egui::Color32::from_rgb(40, 90, 200);
const SELECTED: egui::Color32 = egui::Color32::from_rgb(90, 160, 255);
const DRAFT: egui::Color32 = egui::Color32::from_rgb(200, 140, 40);
const UNCONFIRMED: egui::Color32 = egui::Color32::from_rgb(200, 40, 40);

pub(super) fn tool_button(ui: &mut egui::Ui, label: &str, tool: Tool, selected: Tool) -> bool {
    ui.selectable_label(selected == tool, label).clicked()
}

pub(super) fn status_color(status: Option<TaskStatus>) -> egui::Color32 {
    match status {
        None => egui::Color32::from_gray(140),
        Some(TaskStatus::Pending) => egui::Color32::from_rgb(200, 140, 40),
        Some(TaskStatus::InProgress) => egui::Color32::from_rgb(40, 90, 200),
        Some(TaskStatus::Blocked) => egui::Color32::from_rgb(200, 40, 40),
        Some(TaskStatus::Completed) => egui::Color32::from_rgb(40, 140, 60),
    }
}

pub(super) fn sync_badge(status: SyncStatus) -> Option<(&'static str, egui::Color32)> {
    match status {
        SyncStatus::Synced => None,
        SyncStatus::Modified => Some(("unsaved", DRAFT)),
        SyncStatus::Pending => Some(("saving", SELECTED)),
        SyncStatus::Unconfirmed => Some(("not saved", UNCONFIRMED)),
    }
}

pub(super) fn draw_background(
    painter: &egui::Painter,
    rect: egui::Rect,
    view: &View,
    origin: egui::Pos2,
    image: Option<&BlueprintImage>,
) {
    let bg = painter.ctx().style().visuals.extreme_bg_color;
    painter.rect_filled(rect, 0.0, bg);
    match image {
        Some(image) => {
            let min = view.image_to_screen(origin, egui::Pos2::ZERO);
            let max = view.image_to_screen(origin, image.size.to_pos2());
            painter.image(
                image.texture.id(),
                egui::Rect::from_min_max(min, max),
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        }
        None => {
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "Open a blueprint image (⌘O)",
                egui::FontId::proportional(16.0),
                egui::Color32::from_gray(120),
            );
        }
    }
}

/// Image-space vertices of a room, with an in-progress vertex drag applied.
fn room_points(state: &ControllerState, room_id: &planmark::model::EntityId, points: &[Point]) -> Vec<Point> {
    let mut points = points.to_vec();
    if let Mode::Dragging(DragTarget::Vertex {
        room_id: dragged,
        index,
        to,
        ..
    }) = &state.mode
    {
        if dragged == room_id {
            if let Some(p) = points.get_mut(*index) {
                *p = *to;
            }
        }
    }
    points
}

pub(super) fn draw_rooms(painter: &egui::Painter, origin: egui::Pos2, view: &View, session: &BlueprintSession) {
    let state = session.state();
    for room in &session.blueprint().rooms {
        let selected = matches!(&state.selection, Some(Selection::Room(id)) if id == &room.id);
        let hovered = matches!(&state.hover, Some(Hover::Room(id)) if id == &room.id);
        let status = session.status(&EntityKey::Room(room.id.clone()));
        let points = room_points(state, &room.id, &room.points);
        let screen = image_points_to_screen(view, origin, &points);

        let color = match status {
            SyncStatus::Unconfirmed => UNCONFIRMED,
            _ if selected => SELECTED,
            _ if room.id.is_local() => DRAFT,
            _ => ROOM_STROKE,
        };
        let width = if selected || hovered { 3.0 } else { 2.0 };
        painter.add(egui::Shape::closed_line(screen.clone(), egui::Stroke::new(width, color)));

        if let Some(center) = polygon_centroid(&points) {
            let label = match sync_badge(status) {
                Some((badge, _)) => format!("{} ({badge})", room.display_name()),
                None => room.display_name().to_string(),
            };
            painter.text(
                view.image_to_screen(origin, to_pos(center)),
                egui::Align2::CENTER_CENTER,
                label,
                egui::FontId::proportional(13.0),
                color,
            );
        }

        if selected {
            for (i, p) in screen.iter().enumerate() {
                let hot = matches!(
                    &state.hover,
                    Some(Hover::Vertex { room_id, index }) if room_id == &room.id && *index == i
                );
                let radius = if hot { 6.0 } else { 4.0 };
                painter.circle_filled(*p, radius, egui::Color32::WHITE);
                painter.circle_stroke(*p, radius, egui::Stroke::new(1.5, SELECTED));
            }
        }
    }
}

pub(super) fn draw_pins(painter: &egui::Painter, origin: egui::Pos2, view: &View, session: &BlueprintSession) {
    let state = session.state();
    for pin in &session.blueprint().pins {
        let position = match &state.mode {
            Mode::Dragging(DragTarget::Pin { pin_id, to, .. }) if pin_id == &pin.id => *to,
            _ => pin.position,
        };
        let center = view.image_to_screen(origin, to_pos(position));
        let task_status = session.linked_task(&pin.id).map(|t| t.status);
        let selected = matches!(&state.selection, Some(Selection::Pin(id)) if id == &pin.id);
        let hovered = matches!(&state.hover, Some(Hover::Pin(id)) if id == &pin.id);

        let radius = if hovered || selected { 9.0 } else { 7.0 };
        painter.circle_filled(center, radius, status_color(task_status));
        let ring = match session.status(&EntityKey::Pin(pin.id.clone())) {
            SyncStatus::Unconfirmed => UNCONFIRMED,
            _ if selected => SELECTED,
            _ => egui::Color32::WHITE,
        };
        painter.circle_stroke(center, radius, egui::Stroke::new(2.0, ring));
    }
}

pub(super) fn draw_in_progress(
    painter: &egui::Painter,
    origin: egui::Pos2,
    view: &View,
    state: &ControllerState,
) {
    let Mode::DrawingRoom { points, cursor } = &state.mode else {
        return;
    };
    let screen = image_points_to_screen(view, origin, points);
    let stroke = egui::Stroke::new(2.0, DRAFT);
    for pair in screen.windows(2) {
        painter.line_segment([pair[0], pair[1]], stroke);
    }
    if let (Some(last), Some(cursor)) = (screen.last(), cursor) {
        let cursor = view.image_to_screen(origin, to_pos(*cursor));
        painter.line_segment([*last, cursor], egui::Stroke::new(1.0, DRAFT));
    }
    for p in &screen {
        painter.circle_filled(*p, 3.5, DRAFT);
    }
    if let (Some(first), Some(Hover::CloseOutline)) = (screen.first(), &state.hover) {
        painter.circle_stroke(*first, 9.0, egui::Stroke::new(2.0, SELECTED));
    }
}

use eframe::egui;
use planmark::blueprint::Blueprint;
use planmark::geometry::{polygon_bounds, polygon_centroid};
use planmark::model::{Point, Task};

use super::render::status_color;

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

fn color_attr(c: egui::Color32) -> String {
    format!("rgb({},{},{})", c.r(), c.g(), c.b())
}

fn points_attr(points: &[Point]) -> String {
    let mut out = String::new();
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{:.3},{:.3}", p.x, p.y));
    }
    out
}

/// Rooms and pins as an SVG overlay in image coordinates. With the image
/// size known the view box matches the image; otherwise it wraps the content.
pub(super) fn blueprint_to_svg(blueprint: &Blueprint, tasks: &[Task], image_size: Option<egui::Vec2>) -> String {
    let (min_x, min_y, width, height) = match image_size {
        Some(size) => (0.0, 0.0, size.x, size.y),
        None => {
            let mut all: Vec<Point> = blueprint.rooms.iter().flat_map(|r| r.points.iter().copied()).collect();
            all.extend(blueprint.pins.iter().map(|p| p.position));
            let padding = 24.0;
            match polygon_bounds(&all) {
                Some((lo, hi)) => (
                    lo.x - padding,
                    lo.y - padding,
                    hi.x - lo.x + padding * 2.0,
                    hi.y - lo.y + padding * 2.0,
                ),
                None => (0.0, 0.0, 800.0, 600.0),
            }
        }
    };

    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    out.push('\n');
    out.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{:.3} {:.3} {:.3} {:.3}" width="{:.3}" height="{:.3}">"#,
        min_x, min_y, width, height, width, height
    ));
    out.push('\n');

    for room in &blueprint.rooms {
        out.push_str(&format!(
            r#"<polygon data-room-id="{}" points="{}" stroke="rgb(40,90,200)" stroke-width="2.000" fill="rgb(40,90,200)" fill-opacity="0.120" />"#,
            escape_xml(room.id.as_str()),
            points_attr(&room.points)
        ));
        out.push('\n');
        if let Some(c) = polygon_centroid(&room.points) {
            out.push_str(&format!(
                r#"<text x="{:.3}" y="{:.3}" text-anchor="middle" font-family="sans-serif" font-size="14.000" fill="rgb(20,20,20)">{}</text>"#,
                c.x,
                c.y,
                escape_xml(room.display_name())
            ));
            out.push('\n');
        }
    }

    for pin in &blueprint.pins {
        let task = blueprint.linked_task(&pin.id, tasks);
        let fill = color_attr(status_color(task.map(|t| t.status)));
        out.push_str(&format!(
            r#"<circle data-pin-id="{}" cx="{:.3}" cy="{:.3}" r="7.000" fill="{}" stroke="rgb(255,255,255)" stroke-width="2.000">"#,
            escape_xml(pin.id.as_str()),
            pin.position.x,
            pin.position.y,
            fill
        ));
        if let Some(task) = task {
            out.push_str(&format!("<title>{}</title>", escape_xml(&task.selector_label())));
        }
        out.push_str("</circle>\n");
    }

    out.push_str("</svg>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use planmark::model::{EntityId, Pin, Room, TaskStatus};

    #[test]
    fn exports_rooms_pins_and_escaped_labels() {
        let blueprint = Blueprint::new(
            vec![Room {
                id: EntityId::new("r1"),
                name: "Bath & <WC>".into(),
                points: vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(0.0, 10.0)],
            }],
            vec![Pin {
                id: EntityId::new("p1"),
                task_id: Some("t1".into()),
                position: Point::new(3.0, 3.0),
            }],
        );
        let tasks = vec![Task {
            id: "t1".into(),
            title: "Tile".into(),
            status: TaskStatus::Blocked,
            priority: Default::default(),
        }];
        let svg = blueprint_to_svg(&blueprint, &tasks, Some(egui::vec2(640.0, 480.0)));
        assert!(svg.contains(r#"viewBox="0.000 0.000 640.000 480.000""#));
        assert!(svg.contains("Bath &amp; &lt;WC&gt;"));
        assert!(svg.contains(r#"points="0.000,0.000 10.000,0.000 0.000,10.000""#));
        assert!(svg.contains("fill=\"rgb(200,40,40)\""));
        assert!(svg.contains("<title>Tile — Blocked</title>"));
    }

    #[test]
    fn empty_blueprint_gets_default_canvas() {
        let svg = blueprint_to_svg(&Blueprint::default(), &[], None);
        assert!(svg.contains(r#"viewBox="0.000 0.000 800.000 600.000""#));
        assert!(svg.trim_end().ends_with("</svg>"));
    }
}

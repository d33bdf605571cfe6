//! Pointer-driven editing of rooms and pins.
//!
//! `step` is a pure transition: it reads the current state and the blueprint,
//! and returns the next state together with the effects the caller must apply.
//! Drags only preview inside the state; the blueprint changes when the drag
//! ends, through `Effect::MoveVertex` / `Effect::MovePin`.

use crate::blueprint::Blueprint;
use crate::model::{EntityId, Pin, Point, Room};
use crate::placement::PopupKind;
use crate::validation::{MIN_ROOM_POINTS, PolygonPolicy, ValidationError};
use serde::{Deserialize, Serialize};

/// Hit radii in screen pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    pub close_radius: f32,
    pub pin_radius: f32,
    pub handle_radius: f32,
    pub polygon_policy: PolygonPolicy,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            close_radius: 12.0,
            pin_radius: 10.0,
            handle_radius: 8.0,
            polygon_policy: PolygonPolicy::Permissive,
        }
    }
}

impl InteractionConfig {
    /// Converts the screen radii to image units at `zoom`.
    pub fn scaled(&self, zoom: f32) -> Self {
        let zoom = if zoom > f32::EPSILON { zoom } else { 1.0 };
        Self {
            close_radius: self.close_radius / zoom,
            pin_radius: self.pin_radius / zoom,
            handle_radius: self.handle_radius / zoom,
            polygon_policy: self.polygon_policy,
        }
    }
}

/// A pointer position in both coordinate spaces.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pointer {
    /// Position on the blueprint image.
    pub image: Point,
    /// Position in the viewport; anchors editor popups.
    pub screen: Point,
}

impl Pointer {
    pub fn new(image: Point, screen: Point) -> Self {
        Self { image, screen }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    BeginRoom,
    BeginPin,
    Cancel,
    FinishRoom,
    /// Drops the last vertex of the outline being drawn.
    UndoVertex,
    Tap(Pointer),
    Hover(Pointer),
    DragStart(Pointer),
    DragMove(Pointer),
    DragEnd(Pointer),
    DismissEditor,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Selection {
    Room(EntityId),
    Pin(EntityId),
}

impl Selection {
    pub fn id(&self) -> &EntityId {
        match self {
            Selection::Room(id) | Selection::Pin(id) => id,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Editor {
    pub target: Selection,
    /// Viewport point the editor was opened at.
    pub anchor: Point,
}

impl Editor {
    pub fn kind(&self) -> PopupKind {
        match self.target {
            Selection::Room(_) => PopupKind::RoomEditor,
            Selection::Pin(_) => PopupKind::TaskEditor,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DragTarget {
    Vertex {
        room_id: EntityId,
        index: usize,
        from: Point,
        to: Point,
    },
    Pin {
        pin_id: EntityId,
        from: Point,
        to: Point,
    },
}

impl DragTarget {
    fn with_position(&self, p: Point) -> Self {
        let mut next = self.clone();
        match &mut next {
            DragTarget::Vertex { to, .. } | DragTarget::Pin { to, .. } => *to = p,
        }
        next
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub enum Mode {
    #[default]
    Idle,
    DrawingRoom {
        points: Vec<Point>,
        cursor: Option<Point>,
    },
    PlacingPin,
    Dragging(DragTarget),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Hover {
    Vertex { room_id: EntityId, index: usize },
    Pin(EntityId),
    Room(EntityId),
    CloseOutline,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct ControllerState {
    pub mode: Mode,
    pub selection: Option<Selection>,
    pub editor: Option<Editor>,
    pub hover: Option<Hover>,
}

impl ControllerState {
    pub fn is_idle(&self) -> bool {
        matches!(self.mode, Mode::Idle)
    }

    /// Follows an entity whose temporary id was replaced.
    pub fn rekey(&mut self, old: &EntityId, new: &EntityId) {
        let swap = |id: &mut EntityId| {
            if id == old {
                *id = new.clone();
            }
        };
        if let Some(Selection::Room(id) | Selection::Pin(id)) = &mut self.selection {
            swap(id);
        }
        if let Some(editor) = &mut self.editor {
            let (Selection::Room(id) | Selection::Pin(id)) = &mut editor.target;
            swap(id);
        }
        if let Mode::Dragging(
            DragTarget::Vertex { room_id: id, .. } | DragTarget::Pin { pin_id: id, .. },
        ) = &mut self.mode
        {
            swap(id);
        }
        match &mut self.hover {
            Some(Hover::Vertex { room_id: id, .. } | Hover::Pin(id) | Hover::Room(id)) => swap(id),
            _ => {}
        }
    }

    /// Drops every reference to an entity that no longer exists.
    pub fn forget(&mut self, id: &EntityId) {
        if self.selection.as_ref().is_some_and(|s| s.id() == id) {
            self.selection = None;
        }
        if self.editor.as_ref().is_some_and(|e| e.target.id() == id) {
            self.editor = None;
        }
        let dragging_it = match &self.mode {
            Mode::Dragging(DragTarget::Vertex { room_id, .. }) => room_id == id,
            Mode::Dragging(DragTarget::Pin { pin_id, .. }) => pin_id == id,
            _ => false,
        };
        if dragging_it {
            self.mode = Mode::Idle;
        }
        self.hover = None;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    AddRoom(Room),
    AddPin(Pin),
    MoveVertex {
        room_id: EntityId,
        index: usize,
        to: Point,
    },
    MovePin {
        pin_id: EntityId,
        to: Point,
    },
    OpenEditor(Editor),
    CloseEditor,
    Rejected(ValidationError),
}

fn closes_outline(points: &[Point], p: Point, radius: f32) -> bool {
    points.len() >= MIN_ROOM_POINTS && points.first().is_some_and(|first| first.distance(p) <= radius)
}

fn hit_selection(blueprint: &Blueprint, config: &InteractionConfig, p: Point) -> Option<Selection> {
    if let Some(pin) = blueprint.pin_at(p, config.pin_radius) {
        return Some(Selection::Pin(pin.id.clone()));
    }
    blueprint
        .room_at(p)
        .map(|room| Selection::Room(room.id.clone()))
}

fn selected_vertex(
    state: &ControllerState,
    blueprint: &Blueprint,
    config: &InteractionConfig,
    p: Point,
) -> Option<(EntityId, usize)> {
    let Some(Selection::Room(room_id)) = &state.selection else {
        return None;
    };
    blueprint
        .vertex_at(room_id, p, config.handle_radius)
        .map(|index| (room_id.clone(), index))
}

fn close_editor(next: &mut ControllerState, effects: &mut Vec<Effect>) {
    if next.editor.take().is_some() {
        effects.push(Effect::CloseEditor);
    }
}

fn finish_outline(
    next: &mut ControllerState,
    effects: &mut Vec<Effect>,
    config: &InteractionConfig,
    points: Vec<Point>,
    anchor: Option<Point>,
) {
    match config.polygon_policy.check(&points) {
        Ok(()) => {
            let anchor = anchor
                .or_else(|| crate::geometry::polygon_centroid(&points))
                .unwrap_or_default();
            let room = Room::draft(points);
            let editor = Editor {
                target: Selection::Room(room.id.clone()),
                anchor,
            };
            next.mode = Mode::Idle;
            next.selection = Some(editor.target.clone());
            next.editor = Some(editor.clone());
            effects.push(Effect::AddRoom(room));
            effects.push(Effect::OpenEditor(editor));
        }
        Err(err @ ValidationError::TooFewPoints { .. }) => {
            log::debug!("event=room_discarded reason=too_few_points");
            next.mode = Mode::Idle;
            effects.push(Effect::Rejected(err));
        }
        Err(err) => {
            next.mode = Mode::DrawingRoom {
                points,
                cursor: None,
            };
            effects.push(Effect::Rejected(err));
        }
    }
}

/// Advances the controller by one event.
pub fn step(
    state: &ControllerState,
    blueprint: &Blueprint,
    config: &InteractionConfig,
    event: &Event,
) -> (ControllerState, Vec<Effect>) {
    let mut next = state.clone();
    let mut effects = Vec::new();

    match (&state.mode, event) {
        (Mode::Dragging(_), Event::BeginRoom | Event::BeginPin) => {}
        (_, Event::BeginRoom) => {
            close_editor(&mut next, &mut effects);
            next.selection = None;
            next.hover = None;
            next.mode = Mode::DrawingRoom {
                points: Vec::new(),
                cursor: None,
            };
        }
        (_, Event::BeginPin) => {
            close_editor(&mut next, &mut effects);
            next.selection = None;
            next.hover = None;
            next.mode = Mode::PlacingPin;
        }

        (Mode::DrawingRoom { points, .. }, Event::Tap(pointer)) => {
            if closes_outline(points, pointer.image, config.close_radius) {
                finish_outline(
                    &mut next,
                    &mut effects,
                    config,
                    points.clone(),
                    Some(pointer.screen),
                );
            } else {
                let mut points = points.clone();
                points.push(pointer.image);
                next.mode = Mode::DrawingRoom {
                    points,
                    cursor: Some(pointer.image),
                };
            }
        }
        (Mode::DrawingRoom { points, .. }, Event::FinishRoom) => {
            finish_outline(&mut next, &mut effects, config, points.clone(), None);
        }
        (Mode::DrawingRoom { points, cursor }, Event::UndoVertex) => {
            let mut points = points.clone();
            points.pop();
            next.mode = Mode::DrawingRoom {
                points,
                cursor: *cursor,
            };
        }
        (Mode::DrawingRoom { points, .. }, Event::Hover(pointer)) => {
            next.hover = closes_outline(points, pointer.image, config.close_radius)
                .then_some(Hover::CloseOutline);
            next.mode = Mode::DrawingRoom {
                points: points.clone(),
                cursor: Some(pointer.image),
            };
        }
        (Mode::DrawingRoom { .. } | Mode::PlacingPin, Event::Cancel) => {
            next.mode = Mode::Idle;
            next.hover = None;
        }

        (Mode::PlacingPin, Event::Tap(pointer)) => {
            let pin = Pin::draft(pointer.image);
            let editor = Editor {
                target: Selection::Pin(pin.id.clone()),
                anchor: pointer.screen,
            };
            next.mode = Mode::Idle;
            next.selection = Some(editor.target.clone());
            next.editor = Some(editor.clone());
            effects.push(Effect::AddPin(pin));
            effects.push(Effect::OpenEditor(editor));
        }

        (Mode::Idle, Event::Tap(pointer)) => match hit_selection(blueprint, config, pointer.image) {
            Some(selection) => {
                let editor = Editor {
                    target: selection.clone(),
                    anchor: pointer.screen,
                };
                next.selection = Some(selection);
                next.editor = Some(editor.clone());
                effects.push(Effect::OpenEditor(editor));
            }
            None if state.editor.is_some() => close_editor(&mut next, &mut effects),
            None => next.selection = None,
        },
        (Mode::Idle, Event::Hover(pointer)) => {
            let p = pointer.image;
            next.hover = if let Some((room_id, index)) = selected_vertex(state, blueprint, config, p)
            {
                Some(Hover::Vertex { room_id, index })
            } else {
                hit_selection(blueprint, config, p).map(|s| match s {
                    Selection::Pin(id) => Hover::Pin(id),
                    Selection::Room(id) => Hover::Room(id),
                })
            };
        }
        (Mode::Idle, Event::DragStart(pointer)) => {
            let p = pointer.image;
            let target = if let Some((room_id, index)) = selected_vertex(state, blueprint, config, p)
            {
                blueprint
                    .room(&room_id)
                    .and_then(|room| room.points.get(index).copied())
                    .map(|from| DragTarget::Vertex {
                        room_id,
                        index,
                        from,
                        to: from,
                    })
            } else {
                blueprint.pin_at(p, config.pin_radius).map(|pin| DragTarget::Pin {
                    pin_id: pin.id.clone(),
                    from: pin.position,
                    to: pin.position,
                })
            };
            if let Some(target) = target {
                close_editor(&mut next, &mut effects);
                if let DragTarget::Pin { pin_id, .. } = &target {
                    next.selection = Some(Selection::Pin(pin_id.clone()));
                }
                next.mode = Mode::Dragging(target.with_position(p));
            }
        }
        (Mode::Idle, Event::Cancel) => {
            if state.editor.is_some() {
                close_editor(&mut next, &mut effects);
            } else {
                next.selection = None;
            }
        }

        (Mode::Dragging(target), Event::DragMove(pointer)) => {
            next.mode = Mode::Dragging(target.with_position(pointer.image));
        }
        (Mode::Dragging(target), Event::DragEnd(pointer)) => {
            next.mode = Mode::Idle;
            match target.with_position(pointer.image) {
                DragTarget::Vertex {
                    room_id,
                    index,
                    from,
                    to,
                } if from != to => effects.push(Effect::MoveVertex { room_id, index, to }),
                DragTarget::Pin { pin_id, from, to } if from != to => {
                    effects.push(Effect::MovePin { pin_id, to })
                }
                _ => {}
            }
        }
        (Mode::Dragging(_), Event::Cancel) => next.mode = Mode::Idle,

        (_, Event::DismissEditor) => close_editor(&mut next, &mut effects),

        _ => {}
    }

    (next, effects)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tap(x: f32, y: f32) -> Event {
        Event::Tap(Pointer::new(Point::new(x, y), Point::new(x + 100.0, y + 50.0)))
    }

    fn at(x: f32, y: f32) -> Pointer {
        Pointer::new(Point::new(x, y), Point::new(x, y))
    }

    fn run(
        state: ControllerState,
        blueprint: &mut Blueprint,
        events: &[Event],
    ) -> (ControllerState, Vec<Effect>) {
        let config = InteractionConfig::default();
        let mut state = state;
        let mut all = Vec::new();
        for event in events {
            let (next, effects) = step(&state, blueprint, &config, event);
            for effect in &effects {
                match effect {
                    Effect::AddRoom(room) => blueprint.add_room(room.clone()).unwrap(),
                    Effect::AddPin(pin) => blueprint.add_pin(pin.clone()).unwrap(),
                    Effect::MoveVertex { room_id, index, to } => {
                        blueprint.move_room_vertex(room_id, *index, *to).unwrap()
                    }
                    Effect::MovePin { pin_id, to } => blueprint.move_pin(pin_id, *to).unwrap(),
                    _ => {}
                }
            }
            all.extend(effects);
            state = next;
        }
        (state, all)
    }

    fn added_rooms(effects: &[Effect]) -> Vec<&Room> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::AddRoom(room) => Some(room),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn finish_after_taps_creates_one_room_with_every_tap() {
        for taps in 3..7 {
            let mut bp = Blueprint::default();
            let mut events = vec![Event::BeginRoom];
            for i in 0..taps {
                let angle = i as f32 / taps as f32 * std::f32::consts::TAU;
                events.push(tap(100.0 + 50.0 * angle.cos(), 100.0 + 50.0 * angle.sin()));
            }
            events.push(Event::FinishRoom);
            let (state, effects) = run(ControllerState::default(), &mut bp, &events);

            let rooms = added_rooms(&effects);
            assert_eq!(rooms.len(), 1);
            assert_eq!(rooms[0].points.len(), taps);
            assert_eq!(bp.rooms.len(), 1);
            assert!(state.is_idle());
        }
    }

    #[test]
    fn tapping_first_vertex_closes_the_outline() {
        let mut bp = Blueprint::default();
        let events = [
            Event::BeginRoom,
            tap(0.0, 0.0),
            tap(100.0, 0.0),
            tap(100.0, 100.0),
            tap(3.0, 2.0),
        ];
        let (state, effects) = run(ControllerState::default(), &mut bp, &events);
        let rooms = added_rooms(&effects);
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].points.len(), 3);
        assert!(rooms[0].id.is_local());

        let editor = state.editor.expect("room editor opens");
        assert_eq!(editor.kind(), PopupKind::RoomEditor);
        assert_eq!(editor.anchor, Point::new(103.0, 52.0));
    }

    #[test]
    fn finishing_with_too_few_points_creates_nothing() {
        for taps in 0..3 {
            let mut bp = Blueprint::default();
            let mut events = vec![Event::BeginRoom];
            for i in 0..taps {
                events.push(tap(40.0 * i as f32, 40.0 * i as f32));
            }
            events.push(Event::FinishRoom);
            let (state, effects) = run(ControllerState::default(), &mut bp, &events);
            assert!(added_rooms(&effects).is_empty());
            assert!(bp.rooms.is_empty());
            assert!(effects.contains(&Effect::Rejected(ValidationError::TooFewPoints {
                count: taps
            })));
            assert!(state.is_idle());
        }
    }

    #[test]
    fn early_tap_near_first_vertex_adds_a_vertex() {
        let mut bp = Blueprint::default();
        let events = [Event::BeginRoom, tap(0.0, 0.0), tap(50.0, 0.0), tap(1.0, 1.0)];
        let (state, effects) = run(ControllerState::default(), &mut bp, &events);
        assert!(added_rooms(&effects).is_empty());
        match &state.mode {
            Mode::DrawingRoom { points, .. } => assert_eq!(points.len(), 3),
            other => panic!("unexpected mode {other:?}"),
        }

        let (state, effects) = run(state, &mut bp, &[Event::FinishRoom]);
        assert_eq!(added_rooms(&effects)[0].points.len(), 3);
        assert!(state.is_idle());
    }

    #[test]
    fn strict_policy_keeps_drawing_on_self_intersection() {
        let config = InteractionConfig {
            polygon_policy: PolygonPolicy::RequireSimple,
            ..Default::default()
        };
        let bp = Blueprint::default();
        let state = ControllerState {
            mode: Mode::DrawingRoom {
                points: vec![
                    Point::new(0.0, 0.0),
                    Point::new(100.0, 100.0),
                    Point::new(100.0, 0.0),
                    Point::new(0.0, 100.0),
                ],
                cursor: None,
            },
            ..Default::default()
        };
        let (next, effects) = step(&state, &bp, &config, &Event::FinishRoom);
        assert_eq!(effects, vec![Effect::Rejected(ValidationError::SelfIntersecting)]);
        assert!(matches!(next.mode, Mode::DrawingRoom { ref points, .. } if points.len() == 4));

        let (next, _) = step(&next, &bp, &config, &Event::UndoVertex);
        assert!(matches!(next.mode, Mode::DrawingRoom { ref points, .. } if points.len() == 3));
    }

    #[test]
    fn pin_placement_commits_once_and_returns_to_idle() {
        let mut bp = Blueprint::default();
        let (state, effects) = run(
            ControllerState::default(),
            &mut bp,
            &[Event::BeginPin, tap(10.0, 20.0), tap(300.0, 300.0)],
        );
        assert_eq!(bp.pins.len(), 1);
        assert_eq!(bp.pins[0].position, Point::new(10.0, 20.0));
        assert_eq!(
            effects.iter().filter(|e| matches!(e, Effect::AddPin(_))).count(),
            1
        );
        assert!(state.is_idle());
        assert!(state.editor.is_none(), "second tap on empty canvas closes the editor");
    }

    #[test]
    fn tapping_a_pin_opens_the_task_editor() {
        let mut bp = Blueprint::default();
        bp.add_pin(Pin {
            id: EntityId::new("p1"),
            task_id: None,
            position: Point::new(50.0, 50.0),
        })
        .unwrap();
        let (state, effects) = run(ControllerState::default(), &mut bp, &[tap(54.0, 50.0)]);
        assert_eq!(state.selection, Some(Selection::Pin(EntityId::new("p1"))));
        let editor = state.editor.unwrap();
        assert_eq!(editor.kind(), PopupKind::TaskEditor);
        assert!(matches!(effects.as_slice(), [Effect::OpenEditor(_)]));
    }

    #[test]
    fn empty_tap_with_open_editor_only_closes_it() {
        let mut bp = Blueprint::default();
        bp.add_room(Room {
            id: EntityId::new("r1"),
            name: "Kitchen".into(),
            points: vec![
                Point::new(0.0, 0.0),
                Point::new(40.0, 0.0),
                Point::new(40.0, 40.0),
                Point::new(0.0, 40.0),
            ],
        })
        .unwrap();
        let before = bp.clone();
        let (state, _) = run(ControllerState::default(), &mut bp, &[tap(20.0, 20.0)]);
        assert!(state.editor.is_some());

        let (state, effects) = run(state, &mut bp, &[tap(500.0, 500.0)]);
        assert_eq!(effects, vec![Effect::CloseEditor]);
        assert!(state.editor.is_none());
        assert_eq!(bp, before);
    }

    #[test]
    fn vertex_drag_previews_then_commits_on_release() {
        let mut bp = Blueprint::default();
        bp.add_room(Room {
            id: EntityId::new("r1"),
            name: "Hall".into(),
            points: vec![
                Point::new(0.0, 0.0),
                Point::new(40.0, 0.0),
                Point::new(40.0, 40.0),
            ],
        })
        .unwrap();
        let selected = ControllerState {
            selection: Some(Selection::Room(EntityId::new("r1"))),
            ..Default::default()
        };
        let (state, effects) = run(
            selected,
            &mut bp,
            &[Event::DragStart(at(41.0, 1.0)), Event::DragMove(at(60.0, 5.0))],
        );
        assert!(effects.is_empty());
        assert_eq!(bp.rooms[0].points[1], Point::new(40.0, 0.0), "model untouched mid-drag");
        assert!(matches!(
            state.mode,
            Mode::Dragging(DragTarget::Vertex { index: 1, to, .. }) if to == Point::new(60.0, 5.0)
        ));

        let (state, effects) = run(state, &mut bp, &[Event::DragEnd(at(70.0, 5.0))]);
        assert_eq!(
            effects,
            vec![Effect::MoveVertex {
                room_id: EntityId::new("r1"),
                index: 1,
                to: Point::new(70.0, 5.0)
            }]
        );
        assert_eq!(bp.rooms[0].points[1], Point::new(70.0, 5.0));
        assert!(state.is_idle());
    }

    #[test]
    fn cancelled_pin_drag_leaves_model_alone() {
        let mut bp = Blueprint::default();
        bp.add_pin(Pin {
            id: EntityId::new("p1"),
            task_id: None,
            position: Point::new(5.0, 5.0),
        })
        .unwrap();
        let (state, effects) = run(
            ControllerState::default(),
            &mut bp,
            &[
                Event::DragStart(at(5.0, 5.0)),
                Event::DragMove(at(90.0, 90.0)),
                Event::Cancel,
            ],
        );
        assert!(effects.is_empty());
        assert!(state.is_idle());
        assert_eq!(bp.pins[0].position, Point::new(5.0, 5.0));
    }

    #[test]
    fn radii_scale_with_zoom() {
        let c = InteractionConfig::default().scaled(2.0);
        assert_eq!(c.pin_radius, 5.0);
        assert_eq!(InteractionConfig::default().scaled(0.0), InteractionConfig::default());
    }

    #[test]
    fn rekey_follows_selection_and_editor() {
        let old = EntityId::new("local-x");
        let new = EntityId::new("srv-1");
        let mut state = ControllerState {
            selection: Some(Selection::Pin(old.clone())),
            editor: Some(Editor {
                target: Selection::Pin(old.clone()),
                anchor: Point::default(),
            }),
            ..Default::default()
        };
        state.rekey(&old, &new);
        assert_eq!(state.selection, Some(Selection::Pin(new.clone())));
        assert_eq!(state.editor.unwrap().target, Selection::Pin(new));
    }
}

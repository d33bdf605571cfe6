//! Rooms and pins drawn over one blueprint image.
//!
//! # Invariants
//! - No two rooms share an id; no two pins share an id.
//! - Vector order is draw order; hit-tests return the topmost entry.

use crate::geometry::point_in_polygon;
use crate::model::{EntityId, Pin, Point, Room, Task, TaskId};
use crate::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    DuplicateId(EntityId),
    RoomNotFound(EntityId),
    PinNotFound(EntityId),
    VertexOutOfRange { room: EntityId, index: usize },
    NothingSelected,
    Validation(ValidationError),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateId(id) => write!(f, "id already in use: {id}"),
            Self::RoomNotFound(id) => write!(f, "room not found: {id}"),
            Self::PinNotFound(id) => write!(f, "pin not found: {id}"),
            Self::VertexOutOfRange { room, index } => {
                write!(f, "room {room} has no vertex {index}")
            }
            Self::NothingSelected => write!(f, "nothing is selected"),
            Self::Validation(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ModelError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

pub type ModelResult<T> = Result<T, ModelError>;

/// Partial room update; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomPatch {
    pub name: Option<String>,
    pub points: Option<Vec<Point>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Blueprint {
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub pins: Vec<Pin>,
}

impl Blueprint {
    pub fn new(rooms: Vec<Room>, pins: Vec<Pin>) -> Self {
        Self { rooms, pins }
    }

    pub fn room(&self, id: &EntityId) -> Option<&Room> {
        self.rooms.iter().find(|r| &r.id == id)
    }

    pub fn pin(&self, id: &EntityId) -> Option<&Pin> {
        self.pins.iter().find(|p| &p.id == id)
    }

    fn room_mut(&mut self, id: &EntityId) -> ModelResult<&mut Room> {
        self.rooms
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| ModelError::RoomNotFound(id.clone()))
    }

    fn pin_mut(&mut self, id: &EntityId) -> ModelResult<&mut Pin> {
        self.pins
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| ModelError::PinNotFound(id.clone()))
    }

    pub fn add_room(&mut self, room: Room) -> ModelResult<()> {
        if self.room(&room.id).is_some() {
            return Err(ModelError::DuplicateId(room.id));
        }
        self.rooms.push(room);
        Ok(())
    }

    pub fn update_room(&mut self, id: &EntityId, patch: RoomPatch) -> ModelResult<&Room> {
        let room = self.room_mut(id)?;
        if let Some(name) = patch.name {
            room.name = name;
        }
        if let Some(points) = patch.points {
            room.points = points;
        }
        Ok(room)
    }

    pub fn remove_room(&mut self, id: &EntityId) -> ModelResult<Room> {
        let idx = self
            .rooms
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| ModelError::RoomNotFound(id.clone()))?;
        Ok(self.rooms.remove(idx))
    }

    pub fn move_room_vertex(&mut self, id: &EntityId, index: usize, to: Point) -> ModelResult<()> {
        let room = self.room_mut(id)?;
        let vertex = room
            .points
            .get_mut(index)
            .ok_or_else(|| ModelError::VertexOutOfRange {
                room: id.clone(),
                index,
            })?;
        *vertex = to;
        Ok(())
    }

    pub fn add_pin(&mut self, pin: Pin) -> ModelResult<()> {
        if self.pin(&pin.id).is_some() {
            return Err(ModelError::DuplicateId(pin.id));
        }
        self.pins.push(pin);
        Ok(())
    }

    pub fn relink_pin(&mut self, id: &EntityId, task_id: Option<TaskId>) -> ModelResult<()> {
        self.pin_mut(id)?.task_id = crate::model::normalize_task_id(task_id);
        Ok(())
    }

    pub fn move_pin(&mut self, id: &EntityId, to: Point) -> ModelResult<()> {
        self.pin_mut(id)?.position = to;
        Ok(())
    }

    pub fn remove_pin(&mut self, id: &EntityId) -> ModelResult<Pin> {
        let idx = self
            .pins
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| ModelError::PinNotFound(id.clone()))?;
        Ok(self.pins.remove(idx))
    }

    /// Swaps a room's temporary id for the canonical one.
    pub fn rekey_room(&mut self, old: &EntityId, new: EntityId) -> ModelResult<()> {
        if old == &new {
            return Ok(());
        }
        if self.room(&new).is_some() {
            return Err(ModelError::DuplicateId(new));
        }
        self.room_mut(old)?.id = new;
        Ok(())
    }

    pub fn rekey_pin(&mut self, old: &EntityId, new: EntityId) -> ModelResult<()> {
        if old == &new {
            return Ok(());
        }
        if self.pin(&new).is_some() {
            return Err(ModelError::DuplicateId(new));
        }
        self.pin_mut(old)?.id = new;
        Ok(())
    }

    pub fn pin_for_task(&self, task_id: &str) -> Option<&Pin> {
        self.pins
            .iter()
            .find(|p| p.task_id.as_deref() == Some(task_id))
    }

    /// The task a pin points at, if it is linked and the task is known.
    pub fn linked_task<'t>(&self, pin_id: &EntityId, tasks: &'t [Task]) -> Option<&'t Task> {
        let task_id = self.pin(pin_id)?.task_id.as_deref()?;
        tasks.iter().find(|t| t.id == task_id)
    }

    pub fn pins_in_room(&self, room_id: &EntityId) -> Vec<&Pin> {
        let Some(room) = self.room(room_id) else {
            return Vec::new();
        };
        self.pins
            .iter()
            .filter(|p| point_in_polygon(p.position, &room.points))
            .collect()
    }

    pub fn pin_at(&self, p: Point, radius: f32) -> Option<&Pin> {
        self.pins
            .iter()
            .rev()
            .find(|pin| pin.position.distance(p) <= radius)
    }

    pub fn room_at(&self, p: Point) -> Option<&Room> {
        self.rooms
            .iter()
            .rev()
            .find(|room| point_in_polygon(p, &room.points))
    }

    /// Index of the vertex of `room_id` nearest to `p` within `radius`.
    pub fn vertex_at(&self, room_id: &EntityId, p: Point, radius: f32) -> Option<usize> {
        let room = self.room(room_id)?;
        room.points
            .iter()
            .enumerate()
            .map(|(i, v)| (i, v.distance(p)))
            .filter(|(_, d)| *d <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty() && self.pins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskStatus;

    fn square(id: &str, x: f32, y: f32) -> Room {
        Room {
            id: EntityId::new(id),
            name: id.to_string(),
            points: vec![
                Point::new(x, y),
                Point::new(x + 10.0, y),
                Point::new(x + 10.0, y + 10.0),
                Point::new(x, y + 10.0),
            ],
        }
    }

    fn pin(id: &str, x: f32, y: f32, task: Option<&str>) -> Pin {
        Pin {
            id: EntityId::new(id),
            task_id: task.map(str::to_string),
            position: Point::new(x, y),
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut bp = Blueprint::default();
        bp.add_room(square("r1", 0.0, 0.0)).unwrap();
        let err = bp.add_room(square("r1", 50.0, 50.0)).unwrap_err();
        assert_eq!(err, ModelError::DuplicateId(EntityId::new("r1")));
        assert_eq!(bp.rooms.len(), 1);

        bp.add_pin(pin("p1", 1.0, 1.0, None)).unwrap();
        assert!(bp.add_pin(pin("p1", 2.0, 2.0, None)).is_err());
        assert_eq!(bp.pins.len(), 1);
    }

    #[test]
    fn relinking_updates_in_place() {
        let mut bp = Blueprint::default();
        bp.add_pin(pin("p1", 1.0, 1.0, Some("a"))).unwrap();
        bp.relink_pin(&EntityId::new("p1"), Some("b".into())).unwrap();
        assert_eq!(bp.pins.len(), 1);
        assert_eq!(bp.pins[0].task_id.as_deref(), Some("b"));

        bp.relink_pin(&EntityId::new("p1"), Some(String::new())).unwrap();
        assert_eq!(bp.pins[0].task_id, None);
    }

    #[test]
    fn removing_a_pin_clears_task_linkage() {
        let tasks = vec![Task {
            id: "a".into(),
            title: "Drywall".into(),
            status: TaskStatus::Blocked,
            priority: Default::default(),
        }];
        let mut bp = Blueprint::default();
        bp.add_pin(pin("p1", 1.0, 1.0, Some("a"))).unwrap();
        assert_eq!(
            bp.linked_task(&EntityId::new("p1"), &tasks).map(|t| t.status),
            Some(TaskStatus::Blocked)
        );
        assert!(bp.pin_for_task("a").is_some());

        bp.remove_pin(&EntityId::new("p1")).unwrap();
        assert!(bp.pin_for_task("a").is_none());
        assert!(bp.pins.is_empty());
    }

    #[test]
    fn hit_tests_prefer_topmost() {
        let mut bp = Blueprint::default();
        bp.add_room(square("under", 0.0, 0.0)).unwrap();
        bp.add_room(square("over", 5.0, 5.0)).unwrap();
        assert_eq!(bp.room_at(Point::new(7.0, 7.0)).unwrap().id.as_str(), "over");
        assert_eq!(bp.room_at(Point::new(2.0, 2.0)).unwrap().id.as_str(), "under");
        assert!(bp.room_at(Point::new(40.0, 40.0)).is_none());

        bp.add_pin(pin("p1", 3.0, 3.0, None)).unwrap();
        bp.add_pin(pin("p2", 4.0, 3.0, None)).unwrap();
        assert_eq!(bp.pin_at(Point::new(3.5, 3.0), 2.0).unwrap().id.as_str(), "p2");
        assert!(bp.pin_at(Point::new(30.0, 3.0), 2.0).is_none());
    }

    #[test]
    fn vertex_lookup_picks_nearest_in_radius() {
        let mut bp = Blueprint::default();
        bp.add_room(square("r1", 0.0, 0.0)).unwrap();
        let id = EntityId::new("r1");
        assert_eq!(bp.vertex_at(&id, Point::new(9.0, 1.0), 3.0), Some(1));
        assert_eq!(bp.vertex_at(&id, Point::new(5.0, 5.0), 3.0), None);

        bp.move_room_vertex(&id, 1, Point::new(12.0, -2.0)).unwrap();
        assert_eq!(bp.room(&id).unwrap().points[1], Point::new(12.0, -2.0));
        assert!(matches!(
            bp.move_room_vertex(&id, 9, Point::default()),
            Err(ModelError::VertexOutOfRange { index: 9, .. })
        ));
    }

    #[test]
    fn rekey_refuses_collisions() {
        let mut bp = Blueprint::default();
        bp.add_room(square("local-1", 0.0, 0.0)).unwrap();
        bp.add_room(square("r2", 20.0, 0.0)).unwrap();
        assert!(bp.rekey_room(&EntityId::new("local-1"), EntityId::new("r2")).is_err());
        bp.rekey_room(&EntityId::new("local-1"), EntityId::new("r1")).unwrap();
        assert!(bp.room(&EntityId::new("r1")).is_some());
        assert!(bp.room(&EntityId::new("local-1")).is_none());
    }

    #[test]
    fn pins_in_room_uses_polygon_test() {
        let mut bp = Blueprint::default();
        bp.add_room(square("r1", 0.0, 0.0)).unwrap();
        bp.add_pin(pin("in", 5.0, 5.0, None)).unwrap();
        bp.add_pin(pin("out", 15.0, 5.0, None)).unwrap();
        let ids: Vec<_> = bp
            .pins_in_room(&EntityId::new("r1"))
            .iter()
            .map(|p| p.id.as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["in".to_string()]);
    }
}

//! Interface to the durable store of rooms and pins.
//!
//! # Responsibility
//! - Define the operations the editor needs from the backend.
//! - Keep the editor storage-agnostic; `store::JsonFileStore` is one backend.
//!
//! # Invariants
//! - Every call may fail or be slow; callers never assume success.
//! - `save_room` on a room with a local id creates it and returns the
//!   canonical id; on a canonical id it updates in place.

use crate::model::{EntityId, Pin, Point, ProjectId, Room, Task, TaskId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum BridgeError {
    NotFound(String),
    Rejected(String),
    Unavailable(String),
    Io(std::io::Error),
    Format(serde_json::Error),
}

impl Display for BridgeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::Rejected(reason) => write!(f, "rejected by backend: {reason}"),
            Self::Unavailable(reason) => write!(f, "backend unavailable: {reason}"),
            Self::Io(err) => write!(f, "store i/o failed: {err}"),
            Self::Format(err) => write!(f, "store data is malformed: {err}"),
        }
    }
}

impl Error for BridgeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Format(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(value: serde_json::Error) -> Self {
        Self::Format(value)
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;

/// Everything the blueprint view needs for one project.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectSnapshot {
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub pins: Vec<Pin>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

pub trait PersistenceBridge {
    fn load_project(&mut self, project: &ProjectId) -> BridgeResult<ProjectSnapshot>;
    fn save_room(&mut self, project: &ProjectId, room: &Room) -> BridgeResult<Room>;
    fn delete_room(&mut self, project: &ProjectId, id: &EntityId) -> BridgeResult<()>;
    fn create_pin(&mut self, project: &ProjectId, position: Point) -> BridgeResult<Pin>;
    fn link_pin_to_task(
        &mut self,
        project: &ProjectId,
        pin: &EntityId,
        task: Option<&TaskId>,
    ) -> BridgeResult<()>;
    fn delete_pin(&mut self, project: &ProjectId, id: &EntityId) -> BridgeResult<()>;

    /// Persists a dragged pin's position. Backends without support reject it
    /// and the pin stays unconfirmed.
    fn save_pin_position(&mut self, _project: &ProjectId, _pin: &Pin) -> BridgeResult<Pin> {
        Err(BridgeError::Rejected("pin moves are not supported".to_string()))
    }
}

/// A bridge call, detached from the caller so it can cross threads.
#[derive(Clone, Debug, PartialEq)]
pub enum BridgeOp {
    SaveRoom(Room),
    DeleteRoom(EntityId),
    CreatePin { local_id: EntityId, position: Point },
    LinkPin { pin_id: EntityId, task_id: Option<TaskId> },
    DeletePin(EntityId),
    MovePin(Pin),
}

impl BridgeOp {
    pub fn name(&self) -> &'static str {
        match self {
            BridgeOp::SaveRoom(_) => "save_room",
            BridgeOp::DeleteRoom(_) => "delete_room",
            BridgeOp::CreatePin { .. } => "create_pin",
            BridgeOp::LinkPin { .. } => "link_pin",
            BridgeOp::DeletePin(_) => "delete_pin",
            BridgeOp::MovePin(_) => "move_pin",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum BridgeOutcome {
    Room(Room),
    Pin(Pin),
    Done,
}

/// Runs one detached op against a bridge.
pub fn execute<B>(bridge: &mut B, project: &ProjectId, op: &BridgeOp) -> BridgeResult<BridgeOutcome>
where
    B: PersistenceBridge + ?Sized,
{
    match op {
        BridgeOp::SaveRoom(room) => bridge.save_room(project, room).map(BridgeOutcome::Room),
        BridgeOp::DeleteRoom(id) => bridge.delete_room(project, id).map(|()| BridgeOutcome::Done),
        BridgeOp::CreatePin { position, .. } => {
            bridge.create_pin(project, *position).map(BridgeOutcome::Pin)
        }
        BridgeOp::LinkPin { pin_id, task_id } => bridge
            .link_pin_to_task(project, pin_id, task_id.as_ref())
            .map(|()| BridgeOutcome::Done),
        BridgeOp::DeletePin(id) => bridge.delete_pin(project, id).map(|()| BridgeOutcome::Done),
        BridgeOp::MovePin(pin) => bridge.save_pin_position(project, pin).map(BridgeOutcome::Pin),
    }
}

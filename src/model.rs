use serde::{Deserialize, Serialize};
use std::fmt;

/// Image-relative coordinate, in pixels of the source blueprint.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

const LOCAL_ID_PREFIX: &str = "local-";

/// Opaque entity identifier.
///
/// Entities created in the editor start with a temporary `local-<uuid>` id
/// until the bridge returns the canonical one.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn local() -> Self {
        Self(format!("{LOCAL_ID_PREFIX}{}", uuid::Uuid::new_v4()))
    }

    pub fn is_local(&self) -> bool {
        self.0.starts_with(LOCAL_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub type TaskId = String;
pub type ProjectId = String;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Room {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    pub points: Vec<Point>,
}

impl Room {
    pub fn draft(points: Vec<Point>) -> Self {
        Self {
            id: EntityId::local(),
            name: String::new(),
            points,
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "Untitled room"
        } else {
            &self.name
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Pin {
    pub id: EntityId,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub task_id: Option<TaskId>,
    pub position: Point,
}

impl Pin {
    pub fn draft(position: Point) -> Self {
        Self {
            id: EntityId::local(),
            task_id: None,
            position,
        }
    }
}

/// Treats `""` as unlinked, matching what the task selector sends.
pub fn normalize_task_id(task_id: Option<TaskId>) -> Option<TaskId> {
    task_id.filter(|t| !t.trim().is_empty())
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<TaskId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<TaskId>::deserialize(deserializer)?;
    Ok(normalize_task_id(raw))
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Blocked,
    Completed,
}

impl TaskStatus {
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Blocked => "Blocked",
            TaskStatus::Completed => "Completed",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    High,
    #[default]
    Medium,
    Low,
}

impl TaskPriority {
    pub fn label(self) -> &'static str {
        match self {
            TaskPriority::High => "High",
            TaskPriority::Medium => "Medium",
            TaskPriority::Low => "Low",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
}

impl Task {
    /// Selector entry text, e.g. `Pour slab — In Progress`.
    pub fn selector_label(&self) -> String {
        format!("{} — {}", self.title, self.status.label())
    }
}

pub fn task_detail_route(project_id: &str, task_id: &str) -> String {
    format!("/project/{project_id}/task/{task_id}")
}

pub fn new_task_route(project_id: &str) -> String {
    format!("/project/{project_id}/task/new")
}

//! Local JSON-file backend for the persistence bridge.
//!
//! One file holds every project. Each mutation rewrites the file through a
//! temporary sibling and a rename, so a crash leaves either the old or the
//! new contents on disk.

use crate::bridge::{BridgeError, BridgeResult, PersistenceBridge, ProjectSnapshot};
use crate::model::{EntityId, Pin, Point, ProjectId, Room, Task, TaskId, normalize_task_id};
use crate::validation::validate_room_name;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct StoreFile {
    #[serde(default)]
    pub projects: BTreeMap<ProjectId, ProjectSnapshot>,
}

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    data: StoreFile,
}

impl JsonFileStore {
    /// Opens `path`; a missing file starts an empty store.
    pub fn open(path: impl Into<PathBuf>) -> BridgeResult<Self> {
        let path = path.into();
        let data = match std::fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreFile::default(),
            Err(e) => return Err(e.into()),
        };
        log::info!(
            "event=store_opened path={} projects={}",
            path.display(),
            data.projects.len()
        );
        Ok(Self { path, data })
    }

    pub fn data(&self) -> &StoreFile {
        &self.data
    }

    /// Seeds the read-only task list of a project.
    pub fn put_tasks(&mut self, project: &ProjectId, tasks: Vec<Task>) -> BridgeResult<()> {
        self.data.projects.entry(project.clone()).or_default().tasks = tasks;
        self.flush()
    }

    fn flush(&self) -> BridgeResult<()> {
        let json = serde_json::to_string_pretty(&self.data)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn project_mut(&mut self, project: &ProjectId) -> BridgeResult<&mut ProjectSnapshot> {
        self.data
            .projects
            .get_mut(project)
            .ok_or_else(|| BridgeError::NotFound(format!("project {project}")))
    }

    fn new_id() -> EntityId {
        EntityId::new(uuid::Uuid::new_v4().to_string())
    }
}

impl PersistenceBridge for JsonFileStore {
    fn load_project(&mut self, project: &ProjectId) -> BridgeResult<ProjectSnapshot> {
        Ok(self.data.projects.get(project).cloned().unwrap_or_default())
    }

    fn save_room(&mut self, project: &ProjectId, room: &Room) -> BridgeResult<Room> {
        let name = validate_room_name(&room.name).map_err(|e| BridgeError::Rejected(e.to_string()))?;
        if room.points.len() < crate::validation::MIN_ROOM_POINTS {
            return Err(BridgeError::Rejected(format!(
                "room needs at least {} points",
                crate::validation::MIN_ROOM_POINTS
            )));
        }
        let entry = self.data.projects.entry(project.clone()).or_default();
        let saved = if room.id.is_local() {
            let saved = Room {
                id: Self::new_id(),
                name,
                points: room.points.clone(),
            };
            entry.rooms.push(saved.clone());
            saved
        } else {
            let existing = entry
                .rooms
                .iter_mut()
                .find(|r| r.id == room.id)
                .ok_or_else(|| BridgeError::NotFound(format!("room {}", room.id)))?;
            existing.name = name;
            existing.points = room.points.clone();
            existing.clone()
        };
        self.flush()?;
        Ok(saved)
    }

    fn delete_room(&mut self, project: &ProjectId, id: &EntityId) -> BridgeResult<()> {
        let entry = self.project_mut(project)?;
        let before = entry.rooms.len();
        entry.rooms.retain(|r| &r.id != id);
        if entry.rooms.len() == before {
            return Err(BridgeError::NotFound(format!("room {id}")));
        }
        self.flush()
    }

    fn create_pin(&mut self, project: &ProjectId, position: Point) -> BridgeResult<Pin> {
        let pin = Pin {
            id: Self::new_id(),
            task_id: None,
            position,
        };
        self.data
            .projects
            .entry(project.clone())
            .or_default()
            .pins
            .push(pin.clone());
        self.flush()?;
        Ok(pin)
    }

    fn link_pin_to_task(
        &mut self,
        project: &ProjectId,
        pin: &EntityId,
        task: Option<&TaskId>,
    ) -> BridgeResult<()> {
        let task = normalize_task_id(task.cloned());
        let entry = self.project_mut(project)?;
        if let Some(task_id) = &task {
            if !entry.tasks.iter().any(|t| &t.id == task_id) {
                return Err(BridgeError::NotFound(format!("task {task_id}")));
            }
        }
        let stored = entry
            .pins
            .iter_mut()
            .find(|p| &p.id == pin)
            .ok_or_else(|| BridgeError::NotFound(format!("pin {pin}")))?;
        stored.task_id = task;
        self.flush()
    }

    fn delete_pin(&mut self, project: &ProjectId, id: &EntityId) -> BridgeResult<()> {
        let entry = self.project_mut(project)?;
        let before = entry.pins.len();
        entry.pins.retain(|p| &p.id != id);
        if entry.pins.len() == before {
            return Err(BridgeError::NotFound(format!("pin {id}")));
        }
        self.flush()
    }

    fn save_pin_position(&mut self, project: &ProjectId, pin: &Pin) -> BridgeResult<Pin> {
        let entry = self.project_mut(project)?;
        let stored = entry
            .pins
            .iter_mut()
            .find(|p| p.id == pin.id)
            .ok_or_else(|| BridgeError::NotFound(format!("pin {}", pin.id)))?;
        stored.position = pin.position;
        let saved = stored.clone();
        self.flush()?;
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(name: &str) -> Room {
        let mut room = Room::draft(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
        ]);
        room.name = name.into();
        room
    }

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path().join("none.json")).unwrap();
        let snapshot = store.load_project(&"p".to_string()).unwrap();
        assert_eq!(snapshot, ProjectSnapshot::default());
    }

    #[test]
    fn create_then_update_keeps_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let project = "p1".to_string();
        let mut store = JsonFileStore::open(&path).unwrap();

        let created = store.save_room(&project, &triangle("  Kitchen ")).unwrap();
        assert!(!created.id.is_local());
        assert_eq!(created.name, "Kitchen");

        let again = store.save_room(&project, &created).unwrap();
        assert_eq!(again, created);

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.data().projects[&project].rooms, vec![created]);
        assert!(!dir.path().join("store.json.tmp").exists());
    }

    #[test]
    fn blank_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path().join("s.json")).unwrap();
        let err = store.save_room(&"p".to_string(), &triangle("   ")).unwrap_err();
        assert!(matches!(err, BridgeError::Rejected(_)));
    }

    #[test]
    fn linking_checks_the_task_exists() {
        let dir = tempfile::tempdir().unwrap();
        let project = "p1".to_string();
        let mut store = JsonFileStore::open(dir.path().join("s.json")).unwrap();
        store
            .put_tasks(
                &project,
                vec![Task {
                    id: "t1".into(),
                    title: "Tile".into(),
                    status: Default::default(),
                    priority: Default::default(),
                }],
            )
            .unwrap();
        let pin = store.create_pin(&project, Point::new(1.0, 2.0)).unwrap();

        store.link_pin_to_task(&project, &pin.id, Some(&"t1".to_string())).unwrap();
        assert!(matches!(
            store.link_pin_to_task(&project, &pin.id, Some(&"nope".to_string())),
            Err(BridgeError::NotFound(_))
        ));
        store.link_pin_to_task(&project, &pin.id, Some(&String::new())).unwrap();
        assert_eq!(store.data().projects[&project].pins[0].task_id, None);
    }

    #[test]
    fn deleting_twice_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let project = "p1".to_string();
        let mut store = JsonFileStore::open(dir.path().join("s.json")).unwrap();
        let pin = store.create_pin(&project, Point::default()).unwrap();
        store.delete_pin(&project, &pin.id).unwrap();
        assert!(matches!(
            store.delete_pin(&project, &pin.id),
            Err(BridgeError::NotFound(_))
        ));
    }
}

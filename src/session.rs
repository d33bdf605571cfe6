//! One open blueprint view.
//!
//! `BlueprintSession` owns the editable model, the controller state and the
//! sync ledger. It is driven from a single thread: every method that touches
//! the backend returns the requests to dispatch instead of sending them, and
//! replies come back through [`BlueprintSession::apply_reply`].

use crate::blueprint::{Blueprint, ModelError, ModelResult, RoomPatch};
use crate::bridge::{BridgeError, BridgeOp, BridgeOutcome, ProjectSnapshot};
use crate::controller::{ControllerState, Effect, Event, InteractionConfig, Selection, step};
use crate::model::{EntityId, Pin, Point, ProjectId, Room, Task, TaskId, normalize_task_id};
use crate::placement::{Size, place_popup};
use crate::sync::{BridgeReply, BridgeRequest, EntityKey, Resolution, SyncLedger};
use crate::validation::{ValidationError, validate_room_name};
use std::collections::HashSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A transient message for the status area.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// How an entity's in-memory value relates to the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncStatus {
    /// Matches the last value the backend confirmed.
    Synced,
    /// Edited locally and not saved yet.
    Modified,
    /// A request for it is in flight or queued.
    Pending,
    /// The last request failed; the local value was kept.
    Unconfirmed,
}

pub struct BlueprintSession {
    project: ProjectId,
    blueprint: Blueprint,
    confirmed: Blueprint,
    tasks: Vec<Task>,
    state: ControllerState,
    config: InteractionConfig,
    zoom: f32,
    ledger: SyncLedger,
    failed: HashSet<EntityKey>,
    notices: Vec<Notice>,
}

impl BlueprintSession {
    pub fn new(project: impl Into<ProjectId>, config: InteractionConfig) -> Self {
        let project = project.into();
        Self {
            ledger: SyncLedger::new(project.clone()),
            project,
            blueprint: Blueprint::default(),
            confirmed: Blueprint::default(),
            tasks: Vec::new(),
            state: ControllerState::default(),
            config,
            zoom: 1.0,
            failed: HashSet::new(),
            notices: Vec::new(),
        }
    }

    pub fn project(&self) -> &ProjectId {
        &self.project
    }

    pub fn blueprint(&self) -> &Blueprint {
        &self.blueprint
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: InteractionConfig) {
        self.config = config;
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom;
    }

    /// Requests sent and not yet answered.
    pub fn in_flight(&self) -> usize {
        self.ledger.in_flight()
    }

    /// Token epoch for load requests; a load reply from another epoch is stale.
    pub fn epoch(&self) -> u32 {
        self.ledger.epoch()
    }

    /// Replaces the model with a freshly loaded project.
    pub fn load(&mut self, snapshot: ProjectSnapshot) {
        log::info!(
            "event=project_loaded project={} rooms={} pins={} tasks={}",
            self.project,
            snapshot.rooms.len(),
            snapshot.pins.len(),
            snapshot.tasks.len()
        );
        self.blueprint = Blueprint::new(snapshot.rooms, snapshot.pins);
        self.confirmed = self.blueprint.clone();
        self.tasks = snapshot.tasks;
        self.state = ControllerState::default();
        self.failed.clear();
    }

    /// Leaves the view. Outstanding requests keep running but their replies
    /// will be ignored.
    pub fn close(&mut self) {
        log::info!(
            "event=view_closed project={} in_flight={}",
            self.project,
            self.ledger.in_flight()
        );
        self.ledger.reset(self.project.clone());
        self.blueprint = Blueprint::default();
        self.confirmed = Blueprint::default();
        self.tasks.clear();
        self.state = ControllerState::default();
        self.failed.clear();
    }

    /// Closes the current view and targets `project`.
    pub fn open(&mut self, project: impl Into<ProjectId>) {
        self.close();
        self.project = project.into();
        self.ledger.reset(self.project.clone());
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NoticeLevel::Info => log::info!("event=notice message={message:?}"),
            NoticeLevel::Error => log::warn!("event=notice message={message:?}"),
        }
        self.notices.push(Notice { level, message });
    }

    pub fn selected_room(&self) -> Option<&Room> {
        match &self.state.selection {
            Some(Selection::Room(id)) => self.blueprint.room(id),
            _ => None,
        }
    }

    pub fn selected_pin(&self) -> Option<&Pin> {
        match &self.state.selection {
            Some(Selection::Pin(id)) => self.blueprint.pin(id),
            _ => None,
        }
    }

    /// Task linked to `pin_id`, if any.
    pub fn linked_task(&self, pin_id: &EntityId) -> Option<&Task> {
        self.blueprint.linked_task(pin_id, &self.tasks)
    }

    pub fn status(&self, key: &EntityKey) -> SyncStatus {
        if self.ledger.is_pending(key) {
            return SyncStatus::Pending;
        }
        if self.failed.contains(key) {
            return SyncStatus::Unconfirmed;
        }
        let same = match key {
            EntityKey::Room(id) => self.blueprint.room(id) == self.confirmed.room(id),
            EntityKey::Pin(id) => self.blueprint.pin(id) == self.confirmed.pin(id),
        };
        if same {
            SyncStatus::Synced
        } else {
            SyncStatus::Modified
        }
    }

    /// Top-left corner of the open editor for the given viewport.
    pub fn popup_position(&self, viewport: Option<Size>) -> Option<Point> {
        let editor = self.state.editor.as_ref()?;
        Some(place_popup(editor.kind(), editor.anchor, viewport))
    }

    /// Feeds one pointer or keyboard event through the controller.
    pub fn handle(&mut self, event: Event) -> Vec<BridgeRequest> {
        let config = self.config.scaled(self.zoom);
        let (next, effects) = step(&self.state, &self.blueprint, &config, &event);
        self.state = next;

        let mut requests = Vec::new();
        for effect in effects {
            if let Err(e) = self.apply_effect(effect, &mut requests) {
                self.notify(NoticeLevel::Error, e.to_string());
            }
        }
        requests
    }

    fn apply_effect(&mut self, effect: Effect, requests: &mut Vec<BridgeRequest>) -> ModelResult<()> {
        match effect {
            Effect::AddRoom(room) => {
                log::debug!("event=room_drawn id={} points={}", room.id, room.points.len());
                self.blueprint.add_room(room)?;
            }
            Effect::AddPin(pin) => {
                log::debug!("event=pin_placed id={}", pin.id);
                let op = BridgeOp::CreatePin {
                    local_id: pin.id.clone(),
                    position: pin.position,
                };
                self.blueprint.add_pin(pin)?;
                requests.extend(self.ledger.issue(op));
            }
            Effect::MoveVertex { room_id, index, to } => {
                self.blueprint.move_room_vertex(&room_id, index, to)?;
            }
            Effect::MovePin { pin_id, to } => {
                self.blueprint.move_pin(&pin_id, to)?;
            }
            Effect::Rejected(err) => self.notify(NoticeLevel::Info, capitalize(&err.to_string())),
            Effect::OpenEditor(_) | Effect::CloseEditor => {}
        }
        Ok(())
    }

    fn editor_room(&self) -> ModelResult<EntityId> {
        match self.state.editor.as_ref().map(|e| &e.target) {
            Some(Selection::Room(id)) => Ok(id.clone()),
            _ => match &self.state.selection {
                Some(Selection::Room(id)) => Ok(id.clone()),
                _ => Err(ModelError::NothingSelected),
            },
        }
    }

    fn editor_pin(&self) -> ModelResult<EntityId> {
        match self.state.editor.as_ref().map(|e| &e.target) {
            Some(Selection::Pin(id)) => Ok(id.clone()),
            _ => match &self.state.selection {
                Some(Selection::Pin(id)) => Ok(id.clone()),
                _ => Err(ModelError::NothingSelected),
            },
        }
    }

    /// Room editor "Save": validates, renames, closes the editor, persists.
    pub fn save_room_name(&mut self, raw: &str) -> ModelResult<Vec<BridgeRequest>> {
        let id = self.editor_room()?;
        let name = validate_room_name(raw)?;
        self.blueprint.update_room(
            &id,
            RoomPatch {
                name: Some(name),
                points: None,
            },
        )?;
        self.state.editor = None;
        self.save_room(&id)
    }

    /// Persists the current value of a room, e.g. after vertex drags.
    pub fn save_room(&mut self, id: &EntityId) -> ModelResult<Vec<BridgeRequest>> {
        let room = self
            .blueprint
            .room(id)
            .ok_or_else(|| ModelError::RoomNotFound(id.clone()))?;
        if room.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        let op = BridgeOp::SaveRoom(room.clone());
        self.failed.remove(&EntityKey::Room(id.clone()));
        Ok(self.ledger.issue(op).into_iter().collect())
    }

    /// Persists a dragged pin's position.
    pub fn save_pin(&mut self, id: &EntityId) -> ModelResult<Vec<BridgeRequest>> {
        let pin = self
            .blueprint
            .pin(id)
            .ok_or_else(|| ModelError::PinNotFound(id.clone()))?
            .clone();
        Ok(self.issue_pin_op(BridgeOp::MovePin(pin)))
    }

    /// Room editor "Cancel". A room that was never saved is discarded.
    pub fn cancel_editor(&mut self) {
        let Some(editor) = self.state.editor.take() else {
            return;
        };
        if let Selection::Room(id) = &editor.target {
            let key = EntityKey::Room(id.clone());
            if id.is_local() && !self.ledger.is_pending(&key) && self.blueprint.remove_room(id).is_ok() {
                log::debug!("event=draft_room_discarded id={id}");
                self.failed.remove(&key);
                self.state.forget(id);
            }
        }
    }

    pub fn delete_room(&mut self) -> ModelResult<Vec<BridgeRequest>> {
        let id = self.editor_room()?;
        self.blueprint.remove_room(&id)?;
        self.state.forget(&id);
        let key = EntityKey::Room(id.clone());
        self.failed.remove(&key);
        if id.is_local() && !self.ledger.is_creating(&key) {
            return Ok(Vec::new());
        }
        Ok(self.ledger.issue(BridgeOp::DeleteRoom(id)).into_iter().collect())
    }

    /// Task editor selection; `None` or an empty id unlinks.
    pub fn link_task(&mut self, task_id: Option<TaskId>) -> ModelResult<Vec<BridgeRequest>> {
        let id = self.editor_pin()?;
        let task_id = normalize_task_id(task_id);
        self.blueprint.relink_pin(&id, task_id.clone())?;
        Ok(self.issue_pin_op(BridgeOp::LinkPin {
            pin_id: id,
            task_id,
        }))
    }

    pub fn delete_pin(&mut self) -> ModelResult<Vec<BridgeRequest>> {
        let id = self.editor_pin()?;
        self.blueprint.remove_pin(&id)?;
        self.state.forget(&id);
        let key = EntityKey::Pin(id.clone());
        self.failed.remove(&key);
        if id.is_local() && !self.ledger.is_creating(&key) {
            return Ok(Vec::new());
        }
        Ok(self.ledger.issue(BridgeOp::DeletePin(id)).into_iter().collect())
    }

    /// Issues `op`; a pin whose create failed earlier is created first.
    fn issue_pin_op(&mut self, op: BridgeOp) -> Vec<BridgeRequest> {
        let key = op.key();
        self.failed.remove(&key);
        let mut requests = Vec::new();
        if key.id().is_local() && !self.ledger.is_creating(&key) {
            if let Some(pin) = self.blueprint.pin(key.id()) {
                let create = BridgeOp::CreatePin {
                    local_id: pin.id.clone(),
                    position: pin.position,
                };
                requests.extend(self.ledger.issue(create));
            }
        }
        requests.extend(self.ledger.issue(op));
        requests
    }

    /// Reconciles one bridge reply. Returns requests released by it.
    pub fn apply_reply(&mut self, reply: BridgeReply) -> Vec<BridgeRequest> {
        match self.ledger.resolve(reply) {
            Resolution::Applied {
                key,
                op,
                outcome,
                released,
            } => {
                self.failed.remove(&key);
                self.apply_outcome(op, outcome);
                released
            }
            Resolution::Failed {
                key,
                op,
                error,
                dropped,
            } => {
                if dropped > 0 {
                    log::debug!("event=deferred_dropped entity={} count={}", key.id(), dropped);
                }
                let deleting = matches!(op, BridgeOp::DeleteRoom(_) | BridgeOp::DeletePin(_));
                if deleting && matches!(error, BridgeError::NotFound(_)) {
                    log::debug!("event=already_deleted entity={}", key.id());
                    self.confirm(&op, BridgeOutcome::Done);
                    return Vec::new();
                }
                if deleting {
                    // Stays listed until a delete succeeds.
                    self.restore(&key);
                }
                let what = match &key {
                    EntityKey::Room(id) => match self.blueprint.room(id) {
                        Some(room) => format!("room \"{}\"", room.display_name()),
                        None => "room".to_string(),
                    },
                    EntityKey::Pin(_) => "pin".to_string(),
                };
                self.failed.insert(key);
                self.notify(
                    NoticeLevel::Error,
                    format!("Could not {} {what}: {error}", verb(&op)),
                );
                Vec::new()
            }
            Resolution::Stale { key, op, outcome } => {
                log::debug!(
                    "event=stale_reply op={} entity={} accepted={}",
                    op.name(),
                    key.id(),
                    outcome.is_some()
                );
                if let Some(outcome) = outcome {
                    self.confirm(&op, outcome);
                }
                Vec::new()
            }
            Resolution::Ignored => {
                log::debug!("event=reply_ignored");
                Vec::new()
            }
        }
    }

    fn apply_outcome(&mut self, op: BridgeOp, outcome: BridgeOutcome) {
        match (&op, &outcome) {
            (BridgeOp::SaveRoom(sent), BridgeOutcome::Room(saved)) => {
                if sent.id != saved.id {
                    // A deleted draft has nothing left to rekey.
                    if self.blueprint.rekey_room(&sent.id, saved.id.clone()).is_ok() {
                        self.state.rekey(&sent.id, &saved.id);
                    }
                    self.failed.remove(&EntityKey::Room(saved.id.clone()));
                }
                let untouched = self
                    .blueprint
                    .room(&saved.id)
                    .is_some_and(|r| r.name == sent.name && r.points == sent.points);
                if untouched {
                    let _ = self.blueprint.update_room(
                        &saved.id,
                        RoomPatch {
                            name: Some(saved.name.clone()),
                            points: Some(saved.points.clone()),
                        },
                    );
                }
            }
            (BridgeOp::CreatePin { local_id, .. }, BridgeOutcome::Pin(saved)) => {
                if self.blueprint.rekey_pin(local_id, saved.id.clone()).is_ok() {
                    self.state.rekey(local_id, &saved.id);
                }
            }
            _ => {}
        }
        self.confirm(&op, outcome);
    }

    /// Records what the backend accepted in the confirmed mirror only.
    fn confirm(&mut self, op: &BridgeOp, outcome: BridgeOutcome) {
        match (op, outcome) {
            (BridgeOp::SaveRoom(_), BridgeOutcome::Room(saved)) => {
                upsert_room(&mut self.confirmed, saved);
            }
            (BridgeOp::CreatePin { .. } | BridgeOp::MovePin(_), BridgeOutcome::Pin(saved)) => {
                upsert_pin(&mut self.confirmed, saved);
            }
            (BridgeOp::LinkPin { pin_id, task_id }, BridgeOutcome::Done) => {
                let _ = self.confirmed.relink_pin(pin_id, task_id.clone());
            }
            (BridgeOp::DeleteRoom(id), BridgeOutcome::Done) => {
                let _ = self.confirmed.remove_room(id);
            }
            (BridgeOp::DeletePin(id), BridgeOutcome::Done) => {
                let _ = self.confirmed.remove_pin(id);
            }
            (op, outcome) => {
                log::warn!("event=unexpected_outcome op={} outcome={outcome:?}", op.name());
            }
        }
    }

    /// Puts the confirmed value of `key` back into the model, replacing the
    /// draft in place or reinserting it at its confirmed position. False when
    /// the backend never confirmed the entity.
    fn restore(&mut self, key: &EntityKey) -> bool {
        match key {
            EntityKey::Room(id) => {
                let Some(at) = self.confirmed.rooms.iter().position(|r| &r.id == id) else {
                    return false;
                };
                let room = self.confirmed.rooms[at].clone();
                match self.blueprint.rooms.iter().position(|r| &r.id == id) {
                    Some(i) => self.blueprint.rooms[i] = room,
                    None => {
                        let at = at.min(self.blueprint.rooms.len());
                        self.blueprint.rooms.insert(at, room);
                    }
                }
            }
            EntityKey::Pin(id) => {
                let Some(at) = self.confirmed.pins.iter().position(|p| &p.id == id) else {
                    return false;
                };
                let pin = self.confirmed.pins[at].clone();
                match self.blueprint.pins.iter().position(|p| &p.id == id) {
                    Some(i) => self.blueprint.pins[i] = pin,
                    None => {
                        let at = at.min(self.blueprint.pins.len());
                        self.blueprint.pins.insert(at, pin);
                    }
                }
            }
        }
        true
    }

    /// Restores the last value the backend confirmed. An entity the backend
    /// never confirmed is removed. Refused while a request is pending.
    pub fn revert(&mut self, key: &EntityKey) -> bool {
        if self.ledger.is_pending(key) {
            return false;
        }
        if !self.restore(key) {
            let _ = match key {
                EntityKey::Room(id) => self.blueprint.remove_room(id).map(drop),
                EntityKey::Pin(id) => self.blueprint.remove_pin(id).map(drop),
            };
            self.state.forget(key.id());
        }
        self.failed.remove(key);
        log::info!("event=entity_reverted entity={}", key.id());
        true
    }
}

fn verb(op: &BridgeOp) -> &'static str {
    match op {
        BridgeOp::SaveRoom(_) => "save",
        BridgeOp::DeleteRoom(_) | BridgeOp::DeletePin(_) => "delete",
        BridgeOp::CreatePin { .. } => "create",
        BridgeOp::LinkPin { .. } => "link",
        BridgeOp::MovePin(_) => "move",
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn upsert_room(blueprint: &mut Blueprint, room: Room) {
    match blueprint.rooms.iter_mut().find(|r| r.id == room.id) {
        Some(existing) => *existing = room,
        None => blueprint.rooms.push(room),
    }
}

fn upsert_pin(blueprint: &mut Blueprint, pin: Pin) {
    match blueprint.pins.iter_mut().find(|p| p.id == pin.id) {
        Some(existing) => *existing = pin,
        None => blueprint.pins.push(pin),
    }
}

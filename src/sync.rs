//! Request sequencing between the editor and the bridge.
//!
//! # Responsibility
//! - Tag every bridge request with a monotonic token.
//! - Decide, per entity, whether a reply is current or stale.
//! - Hold back requests for entities whose create is still in flight and
//!   re-target them to the canonical id once it is known.
//!
//! # Invariants
//! - Only the reply to the latest issued request for an entity is applied.
//! - An entity is never created twice by this ledger.
//! - Replies from before the last `reset` are ignored.
//! - A superseded reply that succeeded still reports its outcome, unless a
//!   newer success for the entity was already reported.

use crate::bridge::{BridgeError, BridgeOp, BridgeOutcome, BridgeResult};
use crate::model::{EntityId, ProjectId};
use std::collections::{HashMap, HashSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken {
    pub epoch: u32,
    pub seq: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Room(EntityId),
    Pin(EntityId),
}

impl EntityKey {
    pub fn id(&self) -> &EntityId {
        match self {
            EntityKey::Room(id) | EntityKey::Pin(id) => id,
        }
    }
}

impl BridgeOp {
    pub fn key(&self) -> EntityKey {
        match self {
            BridgeOp::SaveRoom(room) => EntityKey::Room(room.id.clone()),
            BridgeOp::DeleteRoom(id) => EntityKey::Room(id.clone()),
            BridgeOp::CreatePin { local_id, .. } => EntityKey::Pin(local_id.clone()),
            BridgeOp::LinkPin { pin_id, .. } => EntityKey::Pin(pin_id.clone()),
            BridgeOp::DeletePin(id) => EntityKey::Pin(id.clone()),
            BridgeOp::MovePin(pin) => EntityKey::Pin(pin.id.clone()),
        }
    }

    fn creates(&self) -> bool {
        match self {
            BridgeOp::SaveRoom(room) => room.id.is_local(),
            BridgeOp::CreatePin { .. } => true,
            _ => false,
        }
    }

    fn retargeted(mut self, id: &EntityId) -> Self {
        match &mut self {
            BridgeOp::SaveRoom(room) => room.id = id.clone(),
            BridgeOp::MovePin(pin) => pin.id = id.clone(),
            BridgeOp::DeleteRoom(target)
            | BridgeOp::DeletePin(target)
            | BridgeOp::LinkPin { pin_id: target, .. }
            | BridgeOp::CreatePin {
                local_id: target, ..
            } => *target = id.clone(),
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BridgeRequest {
    pub token: RequestToken,
    pub project: ProjectId,
    pub op: BridgeOp,
}

#[derive(Debug)]
pub struct BridgeReply {
    pub token: RequestToken,
    pub result: BridgeResult<BridgeOutcome>,
}

#[derive(Debug)]
pub enum Resolution {
    /// The reply is current; apply `outcome` to the model.
    Applied {
        key: EntityKey,
        op: BridgeOp,
        outcome: BridgeOutcome,
        /// Held-back requests, now addressed to the canonical id.
        released: Vec<BridgeRequest>,
    },
    /// The current request failed.
    Failed {
        key: EntityKey,
        op: BridgeOp,
        error: BridgeError,
        /// Held-back requests dropped because the create failed.
        dropped: usize,
    },
    /// A newer request for the same entity was issued after this one.
    /// `outcome` is what the backend accepted, when it is newer than any
    /// outcome already reported for the entity; the draft must not change.
    Stale {
        key: EntityKey,
        op: BridgeOp,
        outcome: Option<BridgeOutcome>,
    },
    /// Unknown token or a token from before the last reset.
    Ignored,
}

#[derive(Debug)]
struct InFlight {
    key: EntityKey,
    op: BridgeOp,
}

#[derive(Debug)]
pub struct SyncLedger {
    project: ProjectId,
    epoch: u32,
    next_seq: u64,
    in_flight: HashMap<RequestToken, InFlight>,
    latest: HashMap<EntityKey, RequestToken>,
    settled: HashMap<EntityKey, RequestToken>,
    creating: HashSet<EntityKey>,
    deferred: HashMap<EntityKey, Vec<BridgeOp>>,
}

impl SyncLedger {
    pub fn new(project: impl Into<ProjectId>) -> Self {
        Self {
            project: project.into(),
            epoch: 0,
            next_seq: 0,
            in_flight: HashMap::new(),
            latest: HashMap::new(),
            settled: HashMap::new(),
            creating: HashSet::new(),
            deferred: HashMap::new(),
        }
    }

    pub fn project(&self) -> &ProjectId {
        &self.project
    }

    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Forgets all outstanding work; later replies to it are ignored.
    pub fn reset(&mut self, project: impl Into<ProjectId>) {
        self.project = project.into();
        self.epoch = self.epoch.wrapping_add(1);
        self.in_flight.clear();
        self.latest.clear();
        self.settled.clear();
        self.creating.clear();
        self.deferred.clear();
    }

    pub fn is_creating(&self, key: &EntityKey) -> bool {
        self.creating.contains(key)
    }

    /// True while any request for `key` is in flight or held back.
    pub fn is_pending(&self, key: &EntityKey) -> bool {
        self.latest.contains_key(key) || self.deferred.contains_key(key)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn next_token(&mut self) -> RequestToken {
        self.next_seq += 1;
        RequestToken {
            epoch: self.epoch,
            seq: self.next_seq,
        }
    }

    /// Registers `op`. Returns the request to send, or `None` when it is held
    /// back behind the entity's pending create.
    pub fn issue(&mut self, op: BridgeOp) -> Option<BridgeRequest> {
        let key = op.key();
        if key.id().is_local() && self.creating.contains(&key) {
            log::debug!(
                "event=bridge_deferred op={} entity={}",
                op.name(),
                key.id()
            );
            self.deferred.entry(key).or_default().push(op);
            return None;
        }
        if op.creates() {
            self.creating.insert(key.clone());
        }
        let token = self.next_token();
        self.latest.insert(key.clone(), token);
        self.in_flight.insert(
            token,
            InFlight {
                key,
                op: op.clone(),
            },
        );
        Some(BridgeRequest {
            token,
            project: self.project.clone(),
            op,
        })
    }

    /// Records a successful reply; false when a newer one was recorded.
    fn settle(&mut self, key: &EntityKey, token: RequestToken) -> bool {
        match self.settled.get(key) {
            Some(seen) if *seen > token => false,
            _ => {
                self.settled.insert(key.clone(), token);
                true
            }
        }
    }

    pub fn resolve(&mut self, reply: BridgeReply) -> Resolution {
        if reply.token.epoch != self.epoch {
            return Resolution::Ignored;
        }
        let Some(InFlight { key, op }) = self.in_flight.remove(&reply.token) else {
            return Resolution::Ignored;
        };
        let current = self.latest.get(&key) == Some(&reply.token);
        if current {
            self.latest.remove(&key);
        }
        let was_create = op.creates() && self.creating.remove(&key);

        match reply.result {
            Ok(outcome) if was_create => {
                self.settle(&key, reply.token);
                let canonical = match &outcome {
                    BridgeOutcome::Room(room) => Some(room.id.clone()),
                    BridgeOutcome::Pin(pin) => Some(pin.id.clone()),
                    BridgeOutcome::Done => None,
                };
                let held = self.deferred.remove(&key).unwrap_or_default();
                let released = match canonical {
                    Some(id) => held
                        .into_iter()
                        .filter_map(|op| self.issue(op.retargeted(&id)))
                        .collect(),
                    None => Vec::new(),
                };
                Resolution::Applied {
                    key,
                    op,
                    outcome,
                    released,
                }
            }
            Ok(outcome) if !current => {
                let outcome = self.settle(&key, reply.token).then_some(outcome);
                Resolution::Stale { key, op, outcome }
            }
            Ok(outcome) => {
                self.settle(&key, reply.token);
                Resolution::Applied {
                    key,
                    op,
                    outcome,
                    released: Vec::new(),
                }
            }
            Err(error) => {
                let dropped = if was_create {
                    self.deferred.remove(&key).map_or(0, |held| held.len())
                } else {
                    0
                };
                if current || was_create {
                    Resolution::Failed {
                        key,
                        op,
                        error,
                        dropped,
                    }
                } else {
                    Resolution::Stale {
                        key,
                        op,
                        outcome: None,
                    }
                }
            }
        }
    }
}

//! Runs a persistence bridge on a background thread.
//!
//! The UI thread submits jobs and drains replies with [`BridgeWorker::poll`]
//! once per frame; it never blocks on the backend. Dropping the worker closes
//! the job channel; jobs already queued still run to completion.

use crate::bridge::{BridgeError, BridgeResult, PersistenceBridge, ProjectSnapshot, execute};
use crate::model::ProjectId;
use crate::sync::{BridgeReply, BridgeRequest};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

#[derive(Debug)]
enum Job {
    Request(BridgeRequest),
    Load { epoch: u32, project: ProjectId },
}

#[derive(Debug)]
pub enum WorkerReply {
    Bridge(BridgeReply),
    Loaded {
        epoch: u32,
        project: ProjectId,
        result: BridgeResult<ProjectSnapshot>,
    },
}

pub struct BridgeWorker {
    jobs: Sender<Job>,
    replies: Receiver<WorkerReply>,
}

impl BridgeWorker {
    pub fn spawn<B>(bridge: B) -> std::io::Result<Self>
    where
        B: PersistenceBridge + Send + 'static,
    {
        let (jobs, job_rx) = crossbeam_channel::unbounded::<Job>();
        let (reply_tx, replies) = crossbeam_channel::unbounded::<WorkerReply>();
        std::thread::Builder::new()
            .name("planmark-bridge".to_string())
            .spawn(move || run(bridge, job_rx, reply_tx))?;
        Ok(Self { jobs, replies })
    }

    pub fn submit(&self, request: BridgeRequest) -> BridgeResult<()> {
        self.send(Job::Request(request))
    }

    pub fn submit_all(&self, requests: impl IntoIterator<Item = BridgeRequest>) -> BridgeResult<()> {
        requests.into_iter().try_for_each(|r| self.submit(r))
    }

    pub fn load(&self, epoch: u32, project: ProjectId) -> BridgeResult<()> {
        self.send(Job::Load { epoch, project })
    }

    fn send(&self, job: Job) -> BridgeResult<()> {
        self.jobs
            .send(job)
            .map_err(|_| BridgeError::Unavailable("bridge worker stopped".to_string()))
    }

    /// Every reply that has arrived so far, without blocking.
    pub fn poll(&self) -> Vec<WorkerReply> {
        self.replies.try_iter().collect()
    }

    /// Waits up to `timeout` for the next reply.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<WorkerReply> {
        match self.replies.recv_timeout(timeout) {
            Ok(reply) => Some(reply),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

fn run<B: PersistenceBridge>(mut bridge: B, jobs: Receiver<Job>, replies: Sender<WorkerReply>) {
    log::debug!("event=bridge_worker_started");
    for job in jobs.iter() {
        let reply = match job {
            Job::Request(request) => {
                let result = execute(&mut bridge, &request.project, &request.op);
                match &result {
                    Ok(_) => log::debug!(
                        "event=bridge_ok op={} seq={}",
                        request.op.name(),
                        request.token.seq
                    ),
                    Err(e) => log::warn!(
                        "event=bridge_failed op={} seq={} error={}",
                        request.op.name(),
                        request.token.seq,
                        e
                    ),
                }
                WorkerReply::Bridge(BridgeReply {
                    token: request.token,
                    result,
                })
            }
            Job::Load { epoch, project } => {
                let result = bridge.load_project(&project);
                if let Err(e) = &result {
                    log::warn!("event=project_load_failed project={} error={}", project, e);
                }
                WorkerReply::Loaded {
                    epoch,
                    project,
                    result,
                }
            }
        };
        if replies.send(reply).is_err() {
            break;
        }
    }
    log::debug!("event=bridge_worker_stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::BridgeOp;
    use crate::model::{EntityId, Point};
    use crate::store::JsonFileStore;
    use crate::sync::SyncLedger;

    #[test]
    fn requests_round_trip_through_the_thread() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("s.json")).unwrap();
        let worker = BridgeWorker::spawn(store).unwrap();
        let mut ledger = SyncLedger::new("p1");

        let request = ledger
            .issue(BridgeOp::CreatePin {
                local_id: EntityId::local(),
                position: Point::new(4.0, 5.0),
            })
            .unwrap();
        let token = request.token;
        worker.submit(request).unwrap();

        match worker.recv_timeout(Duration::from_secs(5)) {
            Some(WorkerReply::Bridge(reply)) => {
                assert_eq!(reply.token, token);
                assert!(reply.result.is_ok());
            }
            other => panic!("unexpected reply {other:?}"),
        }

        worker.load(ledger.epoch(), "p1".to_string()).unwrap();
        match worker.recv_timeout(Duration::from_secs(5)) {
            Some(WorkerReply::Loaded { result, .. }) => {
                assert_eq!(result.unwrap().pins.len(), 1);
            }
            other => panic!("unexpected reply {other:?}"),
        }
        assert!(worker.poll().is_empty());
    }
}

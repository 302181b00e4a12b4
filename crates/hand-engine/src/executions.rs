use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl ExecutionStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Outcome of one queued gesture, pollable by id.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionRecord {
    pub id: Uuid,
    pub gesture: String,
    pub staged: bool,
    pub status: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Bounded history of gesture executions. The oldest finished record is
/// evicted first; records still queued or running are never dropped, so the
/// log may briefly exceed its capacity while a backlog drains.
#[derive(Debug, Clone)]
pub(crate) struct ExecutionLog {
    records: Arc<Mutex<VecDeque<ExecutionRecord>>>,
    capacity: usize,
}

impl ExecutionLog {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            records: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    pub(crate) fn submit(&self, gesture: &str, staged: bool) -> ExecutionRecord {
        let record = ExecutionRecord {
            id: Uuid::new_v4(),
            gesture: gesture.to_string(),
            staged,
            status: ExecutionStatus::Queued,
            error: None,
            submitted_at: Utc::now(),
            finished_at: None,
        };
        let mut records = self.lock();
        while records.len() >= self.capacity {
            let Some(oldest_finished) = records.iter().position(|r| r.status.is_finished()) else {
                break;
            };
            records.remove(oldest_finished);
        }
        records.push_back(record.clone());
        record
    }

    pub(crate) fn start(&self, id: Uuid) -> Option<ExecutionRecord> {
        self.update(id, |r| r.status = ExecutionStatus::Running)
    }

    pub(crate) fn finish(&self, id: Uuid, error: Option<String>) -> Option<ExecutionRecord> {
        self.update(id, |r| {
            r.status = if error.is_some() {
                ExecutionStatus::Failed
            } else {
                ExecutionStatus::Succeeded
            };
            r.error = error;
            r.finished_at = Some(Utc::now());
        })
    }

    pub(crate) fn get(&self, id: Uuid) -> Option<ExecutionRecord> {
        self.lock().iter().find(|r| r.id == id).cloned()
    }

    /// Most recent first.
    pub(crate) fn recent(&self) -> Vec<ExecutionRecord> {
        self.lock().iter().rev().cloned().collect()
    }

    fn update(&self, id: Uuid, f: impl FnOnce(&mut ExecutionRecord)) -> Option<ExecutionRecord> {
        let mut records = self.lock();
        let record = records.iter_mut().find(|r| r.id == id)?;
        f(record);
        Some(record.clone())
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ExecutionRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_queued_running_finished() {
        let log = ExecutionLog::new(4);
        let rec = log.submit("fist", true);
        assert_eq!(rec.status, ExecutionStatus::Queued);

        assert_eq!(log.start(rec.id).unwrap().status, ExecutionStatus::Running);
        let done = log.finish(rec.id, None).unwrap();
        assert_eq!(done.status, ExecutionStatus::Succeeded);
        assert!(done.finished_at.is_some());
        assert!(done.status.is_finished());

        let rec = log.submit("point", false);
        let failed = log.finish(rec.id, Some("boom".into())).unwrap();
        assert_eq!(failed.status, ExecutionStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }

    #[test]
    fn evicts_oldest_finished_beyond_capacity() {
        let log = ExecutionLog::new(2);
        let first = log.submit("a", false);
        let second = log.submit("b", false);
        log.finish(first.id, None);
        log.finish(second.id, None);
        log.submit("c", false);
        assert!(log.get(first.id).is_none());
        let names: Vec<_> = log.recent().into_iter().map(|r| r.gesture).collect();
        assert_eq!(names, ["c", "b"]);
    }

    #[test]
    fn in_flight_records_survive_eviction() {
        let log = ExecutionLog::new(2);
        let running = log.submit("a", false);
        log.start(running.id);
        let done = log.submit("b", false);
        log.finish(done.id, Some("boom".into()));

        let queued = log.submit("c", false);
        assert!(log.get(done.id).is_none());
        assert_eq!(log.get(running.id).unwrap().status, ExecutionStatus::Running);

        // Nothing finished left to drop: the backlog stays visible.
        let late = log.submit("d", false);
        for id in [running.id, queued.id, late.id] {
            assert!(log.get(id).is_some());
        }
    }

    #[test]
    fn serializes_status_snake_case() {
        let log = ExecutionLog::new(1);
        let rec = log.submit("fist", true);
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["status"], "queued");
        assert_eq!(json["staged"], true);
        assert!(json.get("error").is_none());
    }
}

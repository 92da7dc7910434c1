//! One-time notices for the session that triggered a validation.
//!
//! A notice is queued under the caller's session key and handed back exactly
//! once: reading drains the queue.
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Per-session queue bound; older notices are dropped first.
const MAX_PER_SESSION: usize = 16;
/// Sessions with undelivered notices; the session that queued first is
/// evicted once this is exceeded.
const MAX_SESSIONS: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Default)]
struct Queues {
    by_session: HashMap<String, VecDeque<Notice>>,
    arrival: VecDeque<String>,
}

#[derive(Default)]
pub struct NoticeBoard {
    queues: Mutex<Queues>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, session: &str, notice: Notice) {
        let mut queues = self.queues.lock().unwrap_or_else(|p| p.into_inner());
        let Queues { by_session, arrival } = &mut *queues;
        if !by_session.contains_key(session) {
            arrival.push_back(session.to_string());
            while arrival.len() > MAX_SESSIONS {
                if let Some(oldest) = arrival.pop_front() {
                    by_session.remove(&oldest);
                }
            }
        }
        let queue = by_session.entry(session.to_string()).or_default();
        queue.push_back(notice);
        while queue.len() > MAX_PER_SESSION {
            queue.pop_front();
        }
    }

    /// Returns and forgets everything queued for `session`.
    pub fn take(&self, session: &str) -> Vec<Notice> {
        let mut queues = self.queues.lock().unwrap_or_else(|p| p.into_inner());
        match queues.by_session.remove(session) {
            Some(queue) => {
                queues.arrival.retain(|s| s != session);
                Vec::from(queue)
            }
            None => Vec::new(),
        }
    }
}

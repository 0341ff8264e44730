//! One-shot events.
//!
//! Firing an event wakes every process currently waiting on it and forgets
//! them; a process has to wait again to see the next fire.

use crate::arena::handle;
use crate::process::ProcessId;

handle!(
    /// Handle to an event owned by one [`Simulation`](crate::Simulation).
    EventId
);

#[derive(Debug)]
pub(crate) struct EventState {
    pub name: String,
    pub waiters: Vec<ProcessId>,
    pub fire_count: u64,
}

impl EventState {
    pub fn new(name: String) -> Self {
        Self {
            name,
            waiters: Vec::new(),
            fire_count: 0,
        }
    }

    /// Records a fire and hands back the processes to wake.
    pub fn fire(&mut self) -> Vec<ProcessId> {
        self.fire_count += 1;
        std::mem::take(&mut self.waiters)
    }

    pub fn subscribe(&mut self, pid: ProcessId) {
        if !self.waiters.contains(&pid) {
            self.waiters.push(pid);
        }
    }

    pub fn unsubscribe(&mut self, pid: ProcessId) {
        self.waiters.retain(|w| *w != pid);
    }
}

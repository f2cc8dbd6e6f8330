//! Per-connection order-entry state machine
//!
//! A connection reads a request, waits for the processor to answer it, writes
//! the answer, and only then reads the next request:
//!
//! ```text
//! AwaitingRequest --request_received--> Processing --processed--> AwaitingSend
//!        ^                                                              |
//!        +---------------------------- sent ----------------------------+
//!
//! any state except Done --finish--> Done
//! ```

use std::fmt;

use crate::error::{Result, ServerError};
use crate::session::ConnectionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    AwaitingRequest,
    Processing,
    AwaitingSend,
    Done,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::AwaitingRequest => "awaiting_request",
            JobState::Processing => "processing",
            JobState::AwaitingSend => "awaiting_send",
            JobState::Done => "done",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobEvent {
    RequestReceived,
    Processed,
    Sent,
    Finish,
}

impl JobEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobEvent::RequestReceived => "request_received",
            JobEvent::Processed => "processed",
            JobEvent::Sent => "sent",
            JobEvent::Finish => "finish",
        }
    }
}

#[derive(Debug)]
pub struct OrderEntryJob {
    connection_id: ConnectionId,
    state: JobState,
    completed: u64,
}

impl OrderEntryJob {
    pub fn new(connection_id: ConnectionId) -> Self {
        Self {
            connection_id,
            state: JobState::AwaitingRequest,
            completed: 0,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Requests answered on this connection
    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn is_awaiting_request(&self) -> bool {
        self.state == JobState::AwaitingRequest
    }

    pub fn is_done(&self) -> bool {
        self.state == JobState::Done
    }

    /// Apply an event, returning the new state
    pub fn transition(&mut self, event: JobEvent) -> Result<JobState> {
        let next = match (self.state, event) {
            (JobState::AwaitingRequest, JobEvent::RequestReceived) => JobState::Processing,
            (JobState::Processing, JobEvent::Processed) => JobState::AwaitingSend,
            (JobState::AwaitingSend, JobEvent::Sent) => {
                self.completed += 1;
                JobState::AwaitingRequest
            }
            (state, JobEvent::Finish) if state != JobState::Done => JobState::Done,
            (state, event) => {
                return Err(ServerError::InvalidJobTransition {
                    from: state.as_str().to_string(),
                    event: event.as_str().to_string(),
                })
            }
        };
        self.state = next;
        Ok(next)
    }

    pub fn request_received(&mut self) -> Result<JobState> {
        self.transition(JobEvent::RequestReceived)
    }

    pub fn processed(&mut self) -> Result<JobState> {
        self.transition(JobEvent::Processed)
    }

    pub fn sent(&mut self) -> Result<JobState> {
        self.transition(JobEvent::Sent)
    }

    pub fn finish(&mut self) -> Result<JobState> {
        self.transition(JobEvent::Finish)
    }
}

//! Task types for the A2A protocol.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::{Message, Role};
use crate::error::{A2aError, A2aResult};

/// Free-form key/value side-channel that domain functions may read and write
pub type TaskContext = HashMap<String, serde_json::Value>;

/// A task represents a unit of orchestrated work.
///
/// Tasks start in [`TaskState::Submitted`] with the caller's message as the
/// only history entry. The history is append-only and the state only moves
/// forward along the state machine described on [`TaskState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier for the task within its store
    pub id: String,

    /// Optional context ID for grouping related tasks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,

    /// Current state of the task
    pub state: TaskState,

    /// Messages exchanged during the task, oldest first
    #[serde(default)]
    pub history: Vec<Message>,

    /// Side-channel values written by the domain function
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: TaskContext,

    /// When the task was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// When the task was last updated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a submitted task whose history starts with `initial`
    pub fn new(id: impl Into<String>, initial: Message) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            context_id: initial.context_id.clone(),
            state: TaskState::Submitted,
            history: vec![initial],
            context: TaskContext::new(),
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// Create a submitted task with a generated UUID
    pub fn new_with_uuid(initial: Message) -> Self {
        Self::new(Uuid::new_v4().to_string(), initial)
    }

    /// Append a message to the history
    pub fn add_message(&mut self, message: Message) {
        self.history.push(message);
        self.updated_at = Some(Utc::now());
    }

    /// Move the task to `next`, rejecting transitions the state machine forbids
    pub fn transition(&mut self, next: TaskState) -> A2aResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(A2aError::InvalidStateTransition {
                task_id: self.id.clone(),
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        self.updated_at = Some(Utc::now());
        Ok(())
    }

    /// Record a successful result: append the agent reply, then complete
    pub fn complete(&mut self, reply: impl Into<String>) -> A2aResult<()> {
        self.ensure_state(TaskState::Completed)?;
        self.add_message(Message::agent(reply));
        self.transition(TaskState::Completed)
    }

    /// Record a failure: append the reason in-band, then fail
    pub fn fail(&mut self, reason: impl std::fmt::Display) -> A2aResult<()> {
        self.ensure_state(TaskState::Failed)?;
        self.add_message(Message::agent(format!("Error: {}", reason)));
        self.transition(TaskState::Failed)
    }

    fn ensure_state(&self, next: TaskState) -> A2aResult<()> {
        if self.state.can_transition_to(next) {
            Ok(())
        } else {
            Err(A2aError::InvalidStateTransition {
                task_id: self.id.clone(),
                from: self.state.to_string(),
                to: next.to_string(),
            })
        }
    }

    /// Check if the task is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Most recent message sent by `role`
    pub fn last_message_from(&self, role: Role) -> Option<&Message> {
        self.history.iter().rev().find(|m| m.role == role)
    }

    /// Text of the most recent user message that carries text
    pub fn last_user_text(&self) -> Option<String> {
        self.history
            .iter()
            .rev()
            .filter(|m| m.role == Role::User)
            .find_map(Message::text)
    }

    /// Text of the most recent agent message
    pub fn last_agent_text(&self) -> Option<String> {
        self.last_message_from(Role::Agent).and_then(Message::text)
    }

    /// Copy of the task with only the newest `length` history entries
    pub fn with_history_limit(mut self, length: Option<usize>) -> Self {
        if let Some(length) = length
            && self.history.len() > length
        {
            let skip = self.history.len() - length;
            self.history.drain(..skip);
        }
        self
    }
}

/// Task state in the lifecycle
///
/// ```text
/// submitted ──► working ──► completed
///                      └──► failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// Accepted and queued, not yet claimed by an executor
    Submitted,

    /// Claimed by an executor and being processed
    Working,

    /// Task completed successfully
    Completed,

    /// Task failed due to an error
    Failed,
}

impl TaskState {
    /// Check if this state is terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (TaskState::Submitted, TaskState::Working)
                | (TaskState::Working, TaskState::Completed)
                | (TaskState::Working, TaskState::Failed)
        )
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Submitted => write!(f, "submitted"),
            TaskState::Working => write!(f, "working"),
            TaskState::Completed => write!(f, "completed"),
            TaskState::Failed => write!(f, "failed"),
        }
    }
}

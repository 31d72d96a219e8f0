//! Audit events for login attempts.
//!
//! Every login emits a `LoginAttempt` event followed by either `Login` or
//! `LoginError`. Intermediate stages emit their own events so operators can
//! see how far a failed attempt got.
//!
//! Events never carry the password or ticket material.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Event type categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// A login was requested.
    LoginAttempt,
    /// The credential verifier accepted the username and password.
    CredentialsVerified,
    /// A ticket was issued for the verified credential.
    TicketIssued,
    /// The principal record was read from the directory.
    DirectoryLookup,
    /// The login completed.
    Login,
    /// The login failed.
    LoginError,
}

/// Outcome of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOutcome {
    /// Operation succeeded.
    Success,
    /// Operation failed.
    Failure,
}

/// A security event for audit logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: Uuid,

    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Type of event.
    pub event_type: EventType,

    /// Outcome of the event.
    pub outcome: EventOutcome,

    /// Correlates all events of one login attempt.
    pub attempt_id: Option<Uuid>,

    /// Normalized realm.
    pub realm: Option<String>,

    /// Username as supplied by the caller.
    pub username: Option<String>,

    /// Error kind (for failure events).
    pub error: Option<String>,

    /// Additional details as key-value pairs.
    pub details: Vec<(String, String)>,
}

impl Event {
    /// Creates a new event builder.
    #[must_use]
    pub const fn builder(event_type: EventType) -> EventBuilder {
        EventBuilder::new(event_type)
    }

    /// Looks up a detail value.
    #[must_use]
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Builder for creating events.
pub struct EventBuilder {
    event_type: EventType,
    outcome: EventOutcome,
    attempt_id: Option<Uuid>,
    realm: Option<String>,
    username: Option<String>,
    error: Option<String>,
    details: Vec<(String, String)>,
}

impl EventBuilder {
    /// Creates a new event builder.
    #[must_use]
    pub const fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            outcome: EventOutcome::Success,
            attempt_id: None,
            realm: None,
            username: None,
            error: None,
            details: Vec::new(),
        }
    }

    /// Sets the outcome to success.
    #[must_use]
    pub const fn success(mut self) -> Self {
        self.outcome = EventOutcome::Success;
        self
    }

    /// Sets the outcome to failure with an error kind.
    #[must_use]
    pub fn failure(mut self, error: impl Into<String>) -> Self {
        self.outcome = EventOutcome::Failure;
        self.error = Some(error.into());
        self
    }

    /// Sets the attempt correlation ID.
    #[must_use]
    pub const fn attempt(mut self, attempt_id: Uuid) -> Self {
        self.attempt_id = Some(attempt_id);
        self
    }

    /// Sets the realm.
    #[must_use]
    pub fn realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    /// Sets the username.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Adds a detail key-value pair.
    #[must_use]
    pub fn detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push((key.into(), value.into()));
        self
    }

    /// Builds the event.
    #[must_use]
    pub fn build(self) -> Event {
        Event {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            event_type: self.event_type,
            outcome: self.outcome,
            attempt_id: self.attempt_id,
            realm: self.realm,
            username: self.username,
            error: self.error,
            details: self.details,
        }
    }
}

// ============================================================================
// Event Sinks
// ============================================================================

/// Error recording an event.
#[derive(Debug, Error)]
#[error("failed to record event: {0}")]
pub struct EventSinkError(pub String);

/// Destination for audit events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Records an event.
    async fn record(&self, event: Event) -> Result<(), EventSinkError>;
}

/// Event sink that writes to the tracing framework at INFO level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl TracingEventSink {
    /// Creates a new tracing sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventSink for TracingEventSink {
    async fn record(&self, event: Event) -> Result<(), EventSinkError> {
        tracing::info!(
            event_id = %event.id,
            event_type = ?event.event_type,
            outcome = ?event.outcome,
            attempt_id = ?event.attempt_id,
            realm = ?event.realm,
            username = ?event.username,
            error = ?event.error,
            "auth_event"
        );
        Ok(())
    }
}

/// Event sink that keeps events in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventSink {
    events: Arc<RwLock<Vec<Event>>>,
}

impl InMemoryEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events
            .read()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Returns the recorded event types in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<EventType> {
        self.events().iter().map(|e| e.event_type).collect()
    }

    /// Removes all recorded events.
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.write() {
            events.clear();
        }
    }
}

#[async_trait]
impl EventSink for InMemoryEventSink {
    async fn record(&self, event: Event) -> Result<(), EventSinkError> {
        self.events
            .write()
            .map_err(|e| EventSinkError(e.to_string()))?
            .push(event);
        Ok(())
    }
}

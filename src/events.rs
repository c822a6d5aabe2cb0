//! Event system for authentication and claim attempts.
//!
//! Provides hooks for logging and custom reactions around each step of a
//! flow. Handlers run synchronously on the calling task, so they must stay
//! cheap; the fire path only dispatches after the request is on the wire.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::AuthState;

#[derive(Debug, Clone)]
pub struct AuthTransitionEvent {
    pub email: String,
    pub from: AuthState,
    pub to: AuthState,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ConnectionReadyEvent {
    pub host: String,
    pub target: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FiredEvent {
    pub username: String,
    pub target: DateTime<Utc>,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct OutcomeEvent {
    pub username: String,
    pub status: u16,
    pub success: bool,
    pub round_trip: Duration,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ErrorEvent {
    pub stage: String,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum ClaimEvent {
    AuthTransition(AuthTransitionEvent),
    ConnectionReady(ConnectionReadyEvent),
    Fired(FiredEvent),
    Outcome(OutcomeEvent),
    Error(ErrorEvent),
}

/// Trait implemented by event handlers.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &ClaimEvent);
}

/// Dispatcher that broadcasts events to registered handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    pub fn register_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn dispatch(&self, event: ClaimEvent) {
        for handler in &self.handlers {
            handler.handle(&event);
        }
    }

    pub fn error(&self, stage: impl Into<String>, error: &impl std::fmt::Display) {
        self.dispatch(ClaimEvent::Error(ErrorEvent {
            stage: stage.into(),
            error: error.to_string(),
            timestamp: Utc::now(),
        }));
    }
}

/// Logs events using the `log` crate.
#[derive(Debug)]
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn handle(&self, event: &ClaimEvent) {
        match event {
            ClaimEvent::AuthTransition(step) => {
                log::debug!("auth {}: {:?} -> {:?}", step.email, step.from, step.to);
            }
            ClaimEvent::ConnectionReady(ready) => {
                log::debug!("connected to {} ahead of {}", ready.host, ready.target);
            }
            ClaimEvent::Fired(fired) => {
                let drift = fired.sent_at - fired.target;
                log::debug!(
                    "claim {} sent at {} ({}ms after target)",
                    fired.username,
                    fired.sent_at,
                    drift.num_milliseconds()
                );
            }
            ClaimEvent::Outcome(outcome) => {
                log::info!(
                    "claim {} -> {} success={} ({:.3}s)",
                    outcome.username,
                    outcome.status,
                    outcome.success,
                    outcome.round_trip.as_secs_f64()
                );
            }
            ClaimEvent::Error(error) => {
                log::warn!("{} failed -> {}", error.stage, error.error);
            }
        }
    }
}

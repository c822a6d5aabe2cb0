//! Claim outcome record.

use chrono::{DateTime, Utc};

use crate::account::Account;

/// Result of one claim attempt. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct ClaimOutcome {
    status: u16,
    success: bool,
    sent_at: DateTime<Utc>,
    received_at: DateTime<Utc>,
    username: String,
    account: Account,
}

impl ClaimOutcome {
    pub fn assemble(
        status: u16,
        sent_at: DateTime<Utc>,
        received_at: DateTime<Utc>,
        username: impl Into<String>,
        account: Account,
    ) -> Self {
        Self {
            status,
            success: status < 300,
            sent_at,
            received_at,
            username: username.into(),
            account,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// `true` for any status below 300.
    pub fn success(&self) -> bool {
        self.success
    }

    pub fn sent_at(&self) -> DateTime<Utc> {
        self.sent_at
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn round_trip(&self) -> std::time::Duration {
        (self.received_at - self.sent_at)
            .to_std()
            .unwrap_or_default()
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn account(&self) -> &Account {
        &self.account
    }
}

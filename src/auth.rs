//! Authentication state machine.
//!
//! Drives an account from raw credentials to a fully authenticated session:
//!
//! 1. Submit credentials and capture bearer, uuid, and username.
//! 2. Load the security questions tied to the account.
//! 3. No questions: done.
//! 4. Otherwise probe whether answers are needed from this location.
//! 5. Not needed: done.
//! 6. Needed: submit the three answers.
//!
//! The flow is strictly linear. Any failure aborts immediately and leaves
//! `authenticated` false, while whatever was captured so far (bearer,
//! questions) stays on the account for inspection.

use chrono::Utc;

use crate::account::Account;
use crate::error::ClaimResult;
use crate::events::{AuthTransitionEvent, ClaimEvent, EventDispatcher};
use crate::provider::ProviderClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthState {
    Unauthenticated,
    CredentialsSubmitted,
    ChallengeLoaded,
    ChallengeSkipped,
    ChallengeRequired,
    Authenticated,
}

/// One pass of the authentication state machine over a single account.
pub struct AuthFlow<'a> {
    provider: &'a ProviderClient,
    events: &'a EventDispatcher,
    state: AuthState,
    history: Vec<AuthState>,
}

impl<'a> AuthFlow<'a> {
    pub fn new(provider: &'a ProviderClient, events: &'a EventDispatcher) -> Self {
        Self {
            provider,
            events,
            state: AuthState::Unauthenticated,
            history: vec![AuthState::Unauthenticated],
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Every state visited so far, in order.
    pub fn history(&self) -> &[AuthState] {
        &self.history
    }

    pub async fn run(&mut self, account: &mut Account) -> ClaimResult<()> {
        account.set_authenticated(false);
        match self.drive(account).await {
            Ok(()) => {
                account.set_authenticated(true);
                Ok(())
            }
            Err(err) => {
                self.events
                    .error(format!("authentication ({:?})", self.state), &err);
                Err(err)
            }
        }
    }

    async fn drive(&mut self, account: &mut Account) -> ClaimResult<()> {
        self.provider.exchange_credentials(account).await?;
        self.transition(account, AuthState::CredentialsSubmitted);

        self.provider.load_security_challenges(account).await?;
        self.transition(account, AuthState::ChallengeLoaded);

        if account.security_challenge().is_empty() {
            self.transition(account, AuthState::Authenticated);
            return Ok(());
        }

        if !self.provider.answer_required(account).await? {
            self.transition(account, AuthState::ChallengeSkipped);
            self.transition(account, AuthState::Authenticated);
            return Ok(());
        }

        self.transition(account, AuthState::ChallengeRequired);
        self.provider.submit_answers(account).await?;
        self.transition(account, AuthState::Authenticated);
        Ok(())
    }

    fn transition(&mut self, account: &Account, next: AuthState) {
        let from = self.state;
        self.state = next;
        self.history.push(next);
        self.events
            .dispatch(ClaimEvent::AuthTransition(AuthTransitionEvent {
                email: account.email().to_string(),
                from,
                to: next,
                timestamp: Utc::now(),
            }));
    }
}

//! Identity provider client.
//!
//! Wraps the provider's REST endpoints behind an injectable
//! [`ProviderTransport`] so every account can own its own connection factory
//! and tests can swap in canned responses.

pub mod reqwest_client;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::account::{Account, SECURITY_QUESTION_COUNT, SecurityChallenge, SecurityQuestion};
use crate::config::ProviderEndpoints;
use crate::error::{AuthError, ClaimError, ClaimResult, ProviderStage, TransportError};

pub use reqwest_client::ReqwestProviderTransport;

/// Request handed to a [`ProviderTransport`].
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl ProviderRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_json_body(mut self, body: Vec<u8>) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(body);
        self
    }
}

/// Minimal response representation returned by the transport abstraction.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ProviderResponse {
    pub fn is_success(&self) -> bool {
        self.status < 300
    }

    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> ClaimResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Contract that abstracts the HTTP transport used to talk to the provider.
#[async_trait]
pub trait ProviderTransport: Send + Sync {
    async fn send(&self, request: ProviderRequest) -> Result<ProviderResponse, TransportError>;
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AuthenticatedUser {
    username: String,
    id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AuthenticateResponse {
    #[serde(rename = "accessToken")]
    access_token: String,
    user: AuthenticatedUser,
}

#[derive(Debug, Deserialize)]
struct ChallengeAnswerRef {
    id: u32,
}

#[derive(Debug, Deserialize)]
struct ChallengeQuestionRef {
    id: u32,
    #[serde(default)]
    question: String,
}

#[derive(Debug, Deserialize)]
struct ChallengeEntry {
    answer: ChallengeAnswerRef,
    question: ChallengeQuestionRef,
}

#[derive(Debug, Serialize)]
struct AnswerSubmission<'a> {
    id: u32,
    answer: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProfileResponse {
    id: String,
    name: String,
}

/// Rename availability for an account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameChangeInfo {
    #[serde(default)]
    pub changed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub name_change_allowed: bool,
}

/// Client for the identity provider's REST surface.
#[derive(Clone)]
pub struct ProviderClient {
    transport: Arc<dyn ProviderTransport>,
    endpoints: ProviderEndpoints,
}

impl ProviderClient {
    pub fn new(transport: Arc<dyn ProviderTransport>, endpoints: ProviderEndpoints) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    pub fn endpoints(&self) -> &ProviderEndpoints {
        &self.endpoints
    }

    /// Build a request carrying the account's bearer token.
    pub fn authenticated_request(
        &self,
        account: &Account,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> ClaimResult<ProviderRequest> {
        let bearer = account.bearer().ok_or(AuthError::NotAuthenticated)?;
        let mut request = ProviderRequest::new(method, Url::parse(url)?);
        let value = HeaderValue::from_str(&format!("Bearer {bearer}"))
            .map_err(|_| ClaimError::InvalidHeader("authorization".into()))?;
        request.headers.insert(AUTHORIZATION, value);
        request
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        request.body = body;
        Ok(request)
    }

    async fn send(&self, request: ProviderRequest) -> ClaimResult<ProviderResponse> {
        log::debug!("-> {} {}", request.method, request.url);
        let response = self.transport.send(request).await?;
        log::debug!("<- {}", response.status);
        Ok(response)
    }

    /// Exchange email and password for a bearer token, filling in the account's identity.
    pub async fn exchange_credentials(&self, account: &mut Account) -> ClaimResult<()> {
        let payload = json!({
            "agent": { "name": "Minecraft", "version": 1 },
            "username": account.email(),
            "password": account.password(),
            "requestUser": true,
        });
        let request = ProviderRequest::new(Method::POST, Url::parse(&self.endpoints.authenticate)?)
            .with_json_body(serde_json::to_vec(&payload)?);

        let response = self.send(request).await?;
        match response.status {
            status if status < 300 => {
                let parsed: AuthenticateResponse = response.json()?;
                if parsed.access_token.is_empty() {
                    return Err(ClaimError::unexpected(ProviderStage::CredentialExchange, status));
                }
                account.set_session(parsed.access_token, parsed.user.id, parsed.user.username);
                Ok(())
            }
            403 => Err(AuthError::InvalidCredentials.into()),
            status => Err(ClaimError::unexpected(ProviderStage::CredentialExchange, status)),
        }
    }

    /// Load the security questions tied to the account. The provider may return none.
    pub async fn load_security_challenges(&self, account: &mut Account) -> ClaimResult<()> {
        let request = self.authenticated_request(
            account,
            Method::GET,
            &self.endpoints.security_challenges,
            None,
        )?;
        let response = self.send(request).await?;
        if response.status >= 400 {
            return Err(ClaimError::unexpected(ProviderStage::ChallengeListing, response.status));
        }

        let entries: Vec<ChallengeEntry> = if response.body.is_empty() {
            Vec::new()
        } else {
            response.json()?
        };
        let questions = entries
            .into_iter()
            .map(|entry| SecurityQuestion {
                question_id: entry.question.id,
                question: entry.question.question,
                answer_id: entry.answer.id,
            })
            .collect();

        let challenge = SecurityChallenge::from_questions(questions)
            .ok_or_else(|| ClaimError::unexpected(ProviderStage::ChallengeListing, response.status))?;
        account.set_challenge(challenge);
        Ok(())
    }

    /// Whether the provider wants the security answers from this location right now.
    pub async fn answer_required(&self, account: &Account) -> ClaimResult<bool> {
        let request = self.authenticated_request(
            account,
            Method::GET,
            &self.endpoints.security_location,
            None,
        )?;
        let response = self.send(request).await?;
        match response.status {
            204 => Ok(false),
            403 => Ok(true),
            status => Err(ClaimError::unexpected(ProviderStage::ChallengeProbe, status)),
        }
    }

    /// Submit the caller's answers, paired positionally with the loaded questions.
    pub async fn submit_answers(&self, account: &Account) -> ClaimResult<()> {
        let answers = account.security_answers();
        let questions = account.security_challenge().questions();
        if answers.len() != SECURITY_QUESTION_COUNT {
            return Err(ClaimError::InputValidation(format!(
                "expected {SECURITY_QUESTION_COUNT} security answers, got {}",
                answers.len()
            )));
        }
        if questions.len() != SECURITY_QUESTION_COUNT {
            return Err(ClaimError::InputValidation(format!(
                "expected {SECURITY_QUESTION_COUNT} loaded security questions, got {}",
                questions.len()
            )));
        }

        let submission: Vec<AnswerSubmission<'_>> = questions
            .iter()
            .zip(answers)
            .map(|(question, answer)| AnswerSubmission {
                id: question.answer_id,
                answer: answer.as_str(),
            })
            .collect();
        let body = serde_json::to_vec(&submission)?;

        let request = self.authenticated_request(
            account,
            Method::POST,
            &self.endpoints.security_location,
            Some(body),
        )?;
        let response = self.send(request).await?;
        match response.status {
            204 => Ok(()),
            403 => Err(AuthError::WrongAnswer.into()),
            status => Err(ClaimError::unexpected(ProviderStage::AnswerSubmission, status)),
        }
    }

    /// Refresh the account's uuid and username from the game profile.
    pub async fn load_profile(&self, account: &mut Account) -> ClaimResult<()> {
        let request =
            self.authenticated_request(account, Method::GET, &self.endpoints.profile, None)?;
        let response = self.send(request).await?;
        match response.status {
            404 => Err(AuthError::NoGameOwnership.into()),
            status if status >= 400 => {
                Err(ClaimError::unexpected(ProviderStage::ProfileRead, status))
            }
            _ => {
                let profile: ProfileResponse = response.json()?;
                account.set_profile(profile.id, profile.name);
                Ok(())
            }
        }
    }

    pub async fn name_change_info(&self, account: &Account) -> ClaimResult<NameChangeInfo> {
        let request =
            self.authenticated_request(account, Method::GET, &self.endpoints.name_change, None)?;
        let response = self.send(request).await?;
        if response.status >= 400 {
            return Err(ClaimError::unexpected(ProviderStage::NameChangeInfo, response.status));
        }
        response.json()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Replays queued responses and records every request it receives.
    pub(crate) struct StubTransport {
        responses: Mutex<VecDeque<ProviderResponse>>,
        pub(crate) requests: Mutex<Vec<ProviderRequest>>,
    }

    impl StubTransport {
        pub(crate) fn new(responses: Vec<(u16, &str)>) -> Self {
            Self {
                responses: Mutex::new(
                    responses
                        .into_iter()
                        .map(|(status, body)| ProviderResponse {
                            status,
                            body: body.as_bytes().to_vec(),
                        })
                        .collect(),
                ),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub(crate) fn urls(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|request| request.url.to_string())
                .collect()
        }
    }

    #[async_trait]
    impl ProviderTransport for StubTransport {
        async fn send(&self, request: ProviderRequest) -> Result<ProviderResponse, TransportError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| TransportError::Other("no more stub responses".into()))
        }
    }

    pub(crate) const AUTH_OK: &str =
        r#"{"accessToken":"token-123","clientToken":"c","user":{"username":"player@example.com","id":"0f1e2d"}}"#;

    pub(crate) const THREE_QUESTIONS: &str = r#"[
        {"answer":{"id":11},"question":{"id":1,"question":"What is your favorite pet's name?"}},
        {"answer":{"id":12},"question":{"id":2,"question":"What city were you born in?"}},
        {"answer":{"id":13},"question":{"id":3,"question":"What was your first car?"}}
    ]"#;
}

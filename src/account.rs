//! Account data model.
//!
//! An [`Account`] is owned by the caller and mutated in place while the
//! authentication flow progresses. Fields that the flow controls (bearer,
//! profile identity, loaded challenge, authenticated flag) are only writable
//! from inside the crate.

use std::fmt;

/// Number of security questions the provider attaches to an account.
pub const SECURITY_QUESTION_COUNT: usize = 3;

/// Where the account credentials come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountType {
    Mojang,
    Microsoft,
}

/// One provider security question together with the id its answer is submitted under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityQuestion {
    pub question_id: u32,
    pub question: String,
    pub answer_id: u32,
}

/// Security questions loaded for an account. Holds either none or exactly three.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityChallenge {
    questions: Vec<SecurityQuestion>,
}

impl SecurityChallenge {
    /// Returns `None` when the provider handed back a count other than 0 or 3.
    pub fn from_questions(questions: Vec<SecurityQuestion>) -> Option<Self> {
        match questions.len() {
            0 | SECURITY_QUESTION_COUNT => Some(Self { questions }),
            _ => None,
        }
    }

    pub fn questions(&self) -> &[SecurityQuestion] {
        &self.questions
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }
}

/// A game account.
#[derive(Clone)]
pub struct Account {
    email: String,
    password: String,
    account_type: AccountType,
    security_answers: Vec<String>,
    challenge: SecurityChallenge,
    bearer: String,
    uuid: String,
    username: String,
    authenticated: bool,
}

impl Account {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            account_type: AccountType::Mojang,
            security_answers: Vec::new(),
            challenge: SecurityChallenge::default(),
            bearer: String::new(),
            uuid: String::new(),
            username: String::new(),
            authenticated: false,
        }
    }

    /// Account whose bearer was obtained out of band (Microsoft sign-in).
    pub fn with_bearer(bearer: impl Into<String>) -> Self {
        let mut account = Self::new(String::new(), String::new());
        account.account_type = AccountType::Microsoft;
        account.bearer = bearer.into();
        account.authenticated = !account.bearer.is_empty();
        account
    }

    /// Answers are matched positionally with the loaded questions.
    pub fn with_security_answers<I, S>(mut self, answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.security_answers = answers.into_iter().map(Into::into).collect();
        self
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    pub fn account_type(&self) -> AccountType {
        self.account_type
    }

    pub fn security_answers(&self) -> &[String] {
        &self.security_answers
    }

    pub fn security_challenge(&self) -> &SecurityChallenge {
        &self.challenge
    }

    /// Bearer token, present once the credential exchange succeeded.
    pub fn bearer(&self) -> Option<&str> {
        (!self.bearer.is_empty()).then_some(self.bearer.as_str())
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub(crate) fn set_session(&mut self, bearer: String, uuid: String, username: String) {
        if !bearer.is_empty() {
            self.bearer = bearer;
        }
        self.uuid = uuid;
        self.username = username;
    }

    pub(crate) fn set_profile(&mut self, uuid: String, username: String) {
        self.uuid = uuid;
        self.username = username;
    }

    pub(crate) fn set_challenge(&mut self, challenge: SecurityChallenge) {
        self.challenge = challenge;
    }

    pub(crate) fn set_authenticated(&mut self, authenticated: bool) {
        self.authenticated = authenticated;
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("account_type", &self.account_type)
            .field("security_questions", &self.challenge.len())
            .field("bearer", &self.bearer().map(|_| "<redacted>"))
            .field("uuid", &self.uuid)
            .field("username", &self.username)
            .field("authenticated", &self.authenticated)
            .finish()
    }
}

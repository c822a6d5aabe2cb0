//! # nameclaim-rs
//!
//! Authenticate a Minecraft account against the Mojang identity provider and
//! fire a precisely-timed name claim the instant a rename or profile-creation
//! window opens.
//!
//! The claim path skips the regular HTTP client: the request is rendered up
//! front, a TLS connection is opened shortly before the target instant, and
//! at the target the request is finished with a two-byte write. Only the
//! status line of the reply is read.
//!
//! ## Example
//!
//! ```no_run
//! use nameclaim_rs::{Account, ClaimRequest, NameClaimer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let claimer = NameClaimer::new()?;
//!     let mut account = Account::new("player@example.com", "password")
//!         .with_security_answers(["first", "second", "third"]);
//!     claimer.authenticate(&mut account).await?;
//!
//!     let target = chrono::Utc::now() + chrono::Duration::minutes(2);
//!     let outcome = claimer
//!         .claim_name(&account, &ClaimRequest::new("Notch", target, false))
//!         .await?;
//!     println!("{} -> {}", outcome.username(), outcome.status());
//!     Ok(())
//! }
//! ```

mod claimer;

pub mod account;
pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod outcome;
pub mod provider;
pub mod scheduler;
pub mod transmission;

pub use crate::claimer::{ClaimRequest, NameClaimer, NameClaimerBuilder};

pub use crate::account::{
    Account,
    AccountType,
    SECURITY_QUESTION_COUNT,
    SecurityChallenge,
    SecurityQuestion,
};

pub use crate::auth::{AuthFlow, AuthState};

pub use crate::config::{ClaimerConfig, ProviderEndpoints};

pub use crate::error::{
    AuthError,
    ClaimError,
    ClaimResult,
    ErrorKind,
    ProviderStage,
    TransportError,
};

pub use crate::events::{
    AuthTransitionEvent,
    ClaimEvent,
    ConnectionReadyEvent,
    ErrorEvent,
    EventDispatcher,
    EventHandler,
    FiredEvent,
    LoggingHandler,
    OutcomeEvent,
};

pub use crate::outcome::ClaimOutcome;

pub use crate::provider::{
    NameChangeInfo,
    ProviderClient,
    ProviderRequest,
    ProviderResponse,
    ProviderTransport,
    ReqwestProviderTransport,
};

pub use crate::scheduler::{ClaimScheduler, Clock, ManualClock, SystemClock};

pub use crate::transmission::{
    ClaimPayload,
    ClaimStream,
    Connector,
    NativeTlsConnector,
    RawExchange,
    RawTransmissionEngine,
    RequestShape,
    parse_status_code,
    read_status_prefix,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

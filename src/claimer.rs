//! High level claim orchestration.
//!
//! Wires together the provider client, the authentication state machine,
//! the scheduler, and the raw transmission engine behind one entry point.
//! A [`NameClaimer`] only holds shared, immutable collaborators, so one
//! instance can drive any number of accounts concurrently.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::account::Account;
use crate::auth::AuthFlow;
use crate::config::{ClaimerConfig, ProviderEndpoints};
use crate::error::{AuthError, ClaimResult};
use crate::events::{
	ClaimEvent, ConnectionReadyEvent, EventDispatcher, EventHandler, FiredEvent, LoggingHandler,
	OutcomeEvent,
};
use crate::outcome::ClaimOutcome;
use crate::provider::{NameChangeInfo, ProviderClient, ProviderTransport, ReqwestProviderTransport};
use crate::scheduler::{ClaimScheduler, Clock, SystemClock};
use crate::transmission::{
	ClaimPayload, Connector, NativeTlsConnector, RawTransmissionEngine, RequestShape,
};

/// Name to claim, when, and with which request shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRequest {
	pub username: String,
	pub target: DateTime<Utc>,
	pub shape: RequestShape,
}

impl ClaimRequest {
	pub fn new(username: impl Into<String>, target: DateTime<Utc>, create_profile: bool) -> Self {
		Self {
			username: username.into(),
			target,
			shape: RequestShape::from_create_profile(create_profile),
		}
	}

	pub fn with_shape(mut self, shape: RequestShape) -> Self {
		self.shape = shape;
		self
	}
}

/// Fluent builder for [`NameClaimer`].
pub struct NameClaimerBuilder {
	config: ClaimerConfig,
	transport: Option<Arc<dyn ProviderTransport>>,
	connector: Option<Arc<dyn Connector>>,
	clock: Option<Arc<dyn Clock>>,
	handlers: Vec<Arc<dyn EventHandler>>,
	enable_logging: bool,
}

impl NameClaimerBuilder {
	pub fn new() -> Self {
		Self {
			config: ClaimerConfig::default(),
			transport: None,
			connector: None,
			clock: None,
			handlers: Vec::new(),
			enable_logging: true,
		}
	}

	pub fn with_config(mut self, config: ClaimerConfig) -> Self {
		self.config = config;
		self
	}

	pub fn with_endpoints(mut self, endpoints: ProviderEndpoints) -> Self {
		self.config.endpoints = endpoints;
		self
	}

	pub fn with_claim_host(mut self, host: impl Into<String>, port: u16) -> Self {
		self.config.claim_host = host.into();
		self.config.claim_port = port;
		self
	}

	pub fn with_lead_time(mut self, lead_time: std::time::Duration) -> Self {
		self.config.lead_time = lead_time;
		self
	}

	pub fn with_request_timeout(mut self, timeout: std::time::Duration) -> Self {
		self.config.request_timeout = timeout;
		self
	}

	pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.config.user_agent = Some(user_agent.into());
		self
	}

	pub fn with_transport(mut self, transport: Arc<dyn ProviderTransport>) -> Self {
		self.transport = Some(transport);
		self
	}

	pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
		self.connector = Some(connector);
		self
	}

	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = Some(clock);
		self
	}

	pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
		self.handlers.push(handler);
		self
	}

	pub fn disable_logging(mut self) -> Self {
		self.enable_logging = false;
		self
	}

	pub fn build(self) -> ClaimResult<NameClaimer> {
		self.config.validate()?;

		let transport: Arc<dyn ProviderTransport> = match self.transport {
			Some(transport) => transport,
			None => Arc::new(ReqwestProviderTransport::new(
				self.config.request_timeout,
				self.config.user_agent.as_deref(),
			)?),
		};
		let connector: Arc<dyn Connector> = match self.connector {
			Some(connector) => connector,
			None => Arc::new(NativeTlsConnector::new()?),
		};
		let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

		let mut events = EventDispatcher::new();
		if self.enable_logging {
			events.register_handler(Arc::new(LoggingHandler));
		}
		for handler in self.handlers {
			events.register_handler(handler);
		}

		Ok(NameClaimer {
			provider: ProviderClient::new(transport, self.config.endpoints.clone()),
			connector,
			scheduler: ClaimScheduler::new(self.config.lead_time, clock.clone()),
			engine: RawTransmissionEngine::new(self.config.status_prefix_len, clock),
			events: Arc::new(events),
			config: self.config,
		})
	}
}

impl Default for NameClaimerBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Authenticates accounts and fires timed claims.
pub struct NameClaimer {
	config: ClaimerConfig,
	provider: ProviderClient,
	connector: Arc<dyn Connector>,
	scheduler: ClaimScheduler,
	engine: RawTransmissionEngine,
	events: Arc<EventDispatcher>,
}

impl NameClaimer {
	/// Construct a claimer against the live services.
	pub fn new() -> ClaimResult<Self> {
		NameClaimerBuilder::new().build()
	}

	pub fn builder() -> NameClaimerBuilder {
		NameClaimerBuilder::new()
	}

	pub fn config(&self) -> &ClaimerConfig {
		&self.config
	}

	pub fn provider(&self) -> &ProviderClient {
		&self.provider
	}

	/// Run the full authentication flow for `account`.
	pub async fn authenticate(&self, account: &mut Account) -> ClaimResult<()> {
		AuthFlow::new(&self.provider, &self.events).run(account).await
	}

	/// Refresh uuid and username from the game profile.
	pub async fn load_profile(&self, account: &mut Account) -> ClaimResult<()> {
		self.provider.load_profile(account).await
	}

	pub async fn name_change_info(&self, account: &Account) -> ClaimResult<NameChangeInfo> {
		self.provider.name_change_info(account).await
	}

	/// Wait for `request.target`, then send the claim over a connection
	/// opened `lead_time` ahead of it. Single shot: nothing is retried.
	pub async fn claim_name(
		&self,
		account: &Account,
		request: &ClaimRequest,
	) -> ClaimResult<ClaimOutcome> {
		let result = self.run_claim(account, request).await;
		if let Err(ref err) = result {
			self.events.error(format!("claim {}", request.username), err);
		}
		result
	}

	async fn run_claim(&self, account: &Account, request: &ClaimRequest) -> ClaimResult<ClaimOutcome> {
		let bearer = account.bearer().ok_or(AuthError::NotAuthenticated)?;
		let payload = ClaimPayload::build(
			request.shape,
			&self.config.claim_host,
			&request.username,
			bearer,
		)?;

		self.scheduler.wait_for_connect(request.target).await;
		let stream = self
			.connector
			.connect(&self.config.claim_host, self.config.claim_port)
			.await?;
		self.events.dispatch(ClaimEvent::ConnectionReady(ConnectionReadyEvent {
			host: self.config.claim_host.clone(),
			target: request.target,
			timestamp: self.scheduler.now(),
		}));

		self.scheduler.wait_for_fire(request.target).await;
		let exchange = self.engine.transmit(stream, &payload).await?;

		self.events.dispatch(ClaimEvent::Fired(FiredEvent {
			username: request.username.clone(),
			target: request.target,
			sent_at: exchange.sent_at,
		}));

		let outcome = ClaimOutcome::assemble(
			exchange.status,
			exchange.sent_at,
			exchange.received_at,
			request.username.clone(),
			account.clone(),
		);

		self.events.dispatch(ClaimEvent::Outcome(OutcomeEvent {
			username: outcome.username().to_string(),
			status: outcome.status(),
			success: outcome.success(),
			round_trip: outcome.round_trip(),
			timestamp: Utc::now(),
		}));

		Ok(outcome)
	}
}

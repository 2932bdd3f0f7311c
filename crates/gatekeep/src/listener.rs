//! `LoginListener` builder and packet entry point.
//!
//! This is what the host registers with its packet interception
//! framework. It ties the layers together: admission → session registry
//! → name-check / verification tasks, and it never blocks the thread
//! that delivers packets.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use gatekeep_crypto::ServerKeyPair;
use gatekeep_intercept::{DeliveryMarker, LoginConnection, PacketEvent};
use gatekeep_limit::{AdmissionStats, RateLimiter};
use gatekeep_protocol::{ClientLoginPacket, PacketKind};
use gatekeep_session::{ProfileResolver, SessionConfig, SessionRegistry};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::name_check::{self, NameCheckOutcome};
use crate::verify::{self, VerifyOutcome};
use crate::{GatekeepError, ListenerConfig, LoginError, LoginTask};

/// State shared by the listener and every task it spawns.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The key
/// pair is never mutated after build.
pub(crate) struct ListenerShared<R> {
    pub(crate) config: ListenerConfig,
    pub(crate) sessions: SessionRegistry,
    pub(crate) keys: Arc<ServerKeyPair>,
    pub(crate) resolver: R,
}

/// Whether the listener has seen its first live packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerPhase {
    NotReady,
    Ready,
}

/// Why a packet was passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Another observer already cancelled the event.
    Cancelled,
    /// No authentication backend is registered; the server's vanilla
    /// login handles everything.
    NoAuthBackend,
}

/// What [`LoginListener::on_packet`] did with a packet.
#[derive(Debug)]
pub enum Dispatch {
    /// Nothing; delivery continues as if Gatekeep were not installed.
    Ignored(IgnoreReason),

    /// The login start was refused by admission control. No session was
    /// created and no task was spawned.
    Dropped(LoginError),

    /// The login start is held until this name check finishes.
    NameCheck(LoginTask<NameCheckOutcome>),

    /// The encryption response is held until this verification finishes.
    Verify(LoginTask<VerifyOutcome>),
}

/// Builder for a [`LoginListener`].
///
/// # Example
///
/// ```rust,ignore
/// use gatekeep::prelude::*;
///
/// let listener = LoginListenerBuilder::new()
///     .config(config)
///     .auth_backend_available(true)
///     .build(my_resolver)?;
/// ```
pub struct LoginListenerBuilder {
    config: ListenerConfig,
    limiter: Option<Arc<dyn RateLimiter>>,
    keys: Option<Arc<ServerKeyPair>>,
    runtime: Option<Handle>,
    auth_backend: bool,
}

impl LoginListenerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ListenerConfig::default(),
            limiter: None,
            keys: None,
            runtime: None,
            auth_backend: false,
        }
    }

    pub fn config(mut self, config: ListenerConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses `limiter` instead of the one described by `config.admission`.
    pub fn rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Uses an existing key pair instead of generating one.
    pub fn key_pair(mut self, keys: Arc<ServerKeyPair>) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Runtime the tasks are spawned on. Defaults to the runtime `build`
    /// is called from.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Initial state of the auth backend switch, see
    /// [`LoginListener::set_auth_backend_available`].
    pub fn auth_backend_available(mut self, available: bool) -> Self {
        self.auth_backend = available;
        self
    }

    /// Builds the listener around `resolver`.
    ///
    /// Generates the server key pair unless one was supplied, which takes
    /// a noticeable moment for 1024-bit keys. Also starts the session
    /// sweeper on the runtime; it runs until the listener is dropped.
    ///
    /// # Errors
    /// - [`GatekeepError::NoRuntime`]: no runtime given and none current
    /// - [`GatekeepError::Crypto`]: key generation failed
    pub fn build<R: ProfileResolver>(self, resolver: R) -> Result<LoginListener<R>, GatekeepError> {
        let config = self.config.validated();

        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| GatekeepError::NoRuntime)?,
        };

        let keys = match self.keys {
            Some(keys) => keys,
            None => Arc::new(ServerKeyPair::generate(config.key_bits)?),
        };

        let limiter = self
            .limiter
            .unwrap_or_else(|| config.admission.build());

        let sessions = SessionRegistry::new(SessionConfig {
            timeout: config.session_timeout,
        });

        tracing::info!(
            key_bits = config.key_bits,
            session_timeout_secs = config.session_timeout.as_secs(),
            max_attempts = config.admission.max_attempts,
            "login listener built"
        );

        let shared = Arc::new(ListenerShared {
            config,
            sessions,
            keys,
            resolver,
        });
        let sweeper = spawn_session_sweeper(&runtime, &shared);

        Ok(LoginListener {
            shared,
            limiter,
            runtime,
            sweeper,
            ready: AtomicBool::new(false),
            auth_backend: AtomicBool::new(self.auth_backend),
        })
    }
}

impl Default for LoginListenerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Intercepts login start and encryption response packets.
///
/// One instance per server process. Call [`on_packet`](Self::on_packet)
/// from the framework's delivery thread for every packet of the kinds in
/// [`interests`](Self::interests).
pub struct LoginListener<R: ProfileResolver> {
    shared: Arc<ListenerShared<R>>,
    limiter: Arc<dyn RateLimiter>,
    runtime: Handle,
    sweeper: JoinHandle<()>,
    ready: AtomicBool,
    auth_backend: AtomicBool,
}

impl<R: ProfileResolver> LoginListener<R> {
    /// Creates a new builder.
    pub fn builder() -> LoginListenerBuilder {
        LoginListenerBuilder::new()
    }

    /// The packet kinds to register interest in.
    pub fn interests(&self) -> [PacketKind; 2] {
        [PacketKind::LoginStart, PacketKind::EncryptionResponse]
    }

    /// Handles one intercepted packet. Never blocks.
    pub fn on_packet<C: LoginConnection>(&self, event: PacketEvent<C>) -> Dispatch {
        if event.is_cancelled() {
            return Dispatch::Ignored(IgnoreReason::Cancelled);
        }
        if !self.auth_backend.load(Ordering::Acquire) {
            return Dispatch::Ignored(IgnoreReason::NoAuthBackend);
        }

        self.mark_ready();

        let (connection, packet, marker) = event.split();
        match packet {
            ClientLoginPacket::LoginStart { username } => {
                self.on_login_start(connection, username, marker)
            }
            ClientLoginPacket::EncryptionResponse {
                shared_secret,
                verify_token,
            } => self.on_encryption_response(connection, shared_secret, verify_token, marker),
        }
    }

    fn on_login_start<C: LoginConnection>(
        &self,
        connection: Arc<C>,
        username: String,
        marker: DeliveryMarker,
    ) -> Dispatch {
        let origin = connection.origin();

        if !self.limiter.try_acquire() {
            tracing::warn!(
                %origin,
                conn_id = %connection.id(),
                "join limit hit, ignoring login start"
            );
            return Dispatch::Dropped(LoginError::AdmissionRejected);
        }

        // ip:port, unique enough for one login within the session timeout.
        let ticket = self
            .shared
            .sessions
            .start_or_replace(origin, connection.id(), &username);
        tracing::trace!(%origin, username = %username, "login start connecting");

        let hold = marker.hold();
        let shared = Arc::clone(&self.shared);
        Dispatch::NameCheck(LoginTask::spawn(
            &self.runtime,
            name_check::run(shared, connection, ticket, username, hold),
        ))
    }

    fn on_encryption_response<C: LoginConnection>(
        &self,
        connection: Arc<C>,
        shared_secret: Vec<u8>,
        verify_token: Vec<u8>,
        marker: DeliveryMarker,
    ) -> Dispatch {
        let hold = marker.hold();
        let shared = Arc::clone(&self.shared);
        Dispatch::Verify(LoginTask::spawn(
            &self.runtime,
            verify::run(shared, connection, shared_secret, verify_token, hold),
        ))
    }

    fn mark_ready(&self) {
        if !self.ready.swap(true, Ordering::AcqRel) {
            tracing::info!("login listener ready to intercept");
        }
    }

    pub fn phase(&self) -> ListenerPhase {
        if self.is_ready() {
            ListenerPhase::Ready
        } else {
            ListenerPhase::NotReady
        }
    }

    /// Whether a live packet has been processed since startup.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Turns interception on or off. The backend plugin may register
    /// after the listener, so this can change at runtime.
    pub fn set_auth_backend_available(&self, available: bool) {
        let was = self.auth_backend.swap(available, Ordering::AcqRel);
        if was != available {
            tracing::info!(available, "auth backend availability changed");
        }
    }

    pub fn is_auth_backend_available(&self) -> bool {
        self.auth_backend.load(Ordering::Acquire)
    }

    /// The live session registry.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.shared.sessions
    }

    /// Admission counters since startup.
    pub fn admission_stats(&self) -> AdmissionStats {
        self.limiter.stats()
    }

    /// The validated configuration in use.
    pub fn config(&self) -> &ListenerConfig {
        &self.shared.config
    }

    /// DER-encoded public key sent in every encryption request.
    pub fn public_key_der(&self) -> &[u8] {
        self.shared.keys.public_key_der()
    }
}

impl<R: ProfileResolver> Drop for LoginListener<R> {
    fn drop(&mut self) {
        self.sweeper.abort();
    }
}

/// Purges expired sessions every `config.sweep_interval`.
///
/// Offline sessions are never taken by a verification; this is the only
/// place they leave the registry. Holds a `Weak`, so the task stops on its
/// own once the listener state is gone.
fn spawn_session_sweeper<R: ProfileResolver>(
    runtime: &Handle,
    shared: &Arc<ListenerShared<R>>,
) -> JoinHandle<()> {
    let period = shared.config.sweep_interval;
    let shared: Weak<ListenerShared<R>> = Arc::downgrade(shared);

    runtime.spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Some(shared) = shared.upgrade() else {
                tracing::debug!("listener dropped, session sweeper stopping");
                break;
            };
            let purged = shared.sessions.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "expired login sessions purged");
            }
        }
    })
}

//! Mock collaborators shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use gatekeep::{Dispatch, ListenerConfig, LoginListener, LoginListenerBuilder, LoginTask};
use gatekeep::{NameCheckOutcome, VerifyOutcome};
use gatekeep_crypto::{client_encrypt, ServerKeyPair};
use gatekeep_intercept::{
    ConnectionId, EventId, InterceptError, LoginConnection, PacketEvent, PacketGate,
};
use gatekeep_protocol::{
    ClientLoginPacket, EncryptionRequest, OriginKey, PremiumProfile, VerifiedIdentity,
};
use gatekeep_session::{ProfileResolver, ResolveError};
use tokio::sync::Notify;
use uuid::Uuid;

pub const DENY: &str = "Failed to verify username!";

// =========================================================================
// Key material
// =========================================================================

/// Key generation is slow; one pair per test binary.
pub fn test_keys() -> Arc<ServerKeyPair> {
    static KEYS: OnceLock<Arc<ServerKeyPair>> = OnceLock::new();
    KEYS.get_or_init(|| Arc::new(ServerKeyPair::generate(1024).unwrap()))
        .clone()
}

pub fn origin(port: u16) -> OriginKey {
    OriginKey(format!("192.0.2.10:{port}").parse().unwrap())
}

pub fn profile(name: &str) -> PremiumProfile {
    PremiumProfile {
        id: Uuid::from_u128(name.bytes().map(u128::from).sum()),
        name: name.to_string(),
    }
}

// =========================================================================
// RecordingGate
// =========================================================================

/// Counts holds and releases per event.
#[derive(Default)]
pub struct RecordingGate {
    counts: Mutex<HashMap<EventId, (u32, u32)>>,
}

impl RecordingGate {
    pub fn holds(&self, event: EventId) -> u32 {
        self.counts.lock().unwrap().get(&event).map_or(0, |c| c.0)
    }

    pub fn releases(&self, event: EventId) -> u32 {
        self.counts.lock().unwrap().get(&event).map_or(0, |c| c.1)
    }

    /// Number of distinct events that were ever held.
    pub fn held_events(&self) -> usize {
        self.counts.lock().unwrap().len()
    }

    /// Every held event was held once and released once.
    pub fn all_released_once(&self) -> bool {
        self.counts
            .lock()
            .unwrap()
            .values()
            .all(|&(holds, releases)| holds == 1 && releases == 1)
    }
}

impl PacketGate for RecordingGate {
    fn hold(&self, event: EventId) {
        self.counts.lock().unwrap().entry(event).or_default().0 += 1;
    }

    fn release(&self, event: EventId) {
        self.counts.lock().unwrap().entry(event).or_default().1 += 1;
    }
}

// =========================================================================
// RecordingConnection
// =========================================================================

/// Records every outbound action.
pub struct RecordingConnection {
    id: ConnectionId,
    origin: OriginKey,
    fail_sends: AtomicBool,
    requests: Mutex<Vec<EncryptionRequest>>,
    completed: Mutex<Vec<VerifiedIdentity>>,
    disconnects: Mutex<Vec<String>>,
}

impl RecordingConnection {
    pub fn new(id: u64, origin: OriginKey) -> Arc<Self> {
        Arc::new(Self {
            id: ConnectionId::new(id),
            origin,
            fail_sends: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
            disconnects: Mutex::new(Vec::new()),
        })
    }

    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<EncryptionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> EncryptionRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no encryption request was sent")
    }

    pub fn completed(&self) -> Vec<VerifiedIdentity> {
        self.completed.lock().unwrap().clone()
    }

    pub fn disconnects(&self) -> Vec<String> {
        self.disconnects.lock().unwrap().clone()
    }
}

impl LoginConnection for RecordingConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn origin(&self) -> OriginKey {
        self.origin
    }

    fn send_encryption_request(&self, request: EncryptionRequest) -> Result<(), InterceptError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(InterceptError::SendFailed("socket closed".into()));
        }
        self.requests.lock().unwrap().push(request);
        Ok(())
    }

    fn complete_login(&self, identity: VerifiedIdentity) -> Result<(), InterceptError> {
        self.completed.lock().unwrap().push(identity);
        Ok(())
    }

    fn disconnect(&self, reason: &str) {
        self.disconnects.lock().unwrap().push(reason.to_string());
    }
}

// =========================================================================
// ScriptedResolver
// =========================================================================

#[derive(Default)]
struct ResolverState {
    premium: Mutex<HashMap<String, PremiumProfile>>,
    failing: Mutex<HashSet<String>>,
    panicking: Mutex<HashSet<String>>,
    blocked: Mutex<HashMap<String, Arc<Notify>>>,
    refuse_joins: AtomicBool,
    panic_on_join: AtomicBool,
    joins: Mutex<Vec<(String, String)>>,
}

/// Answers from a script. Clones share the script.
#[derive(Clone, Default)]
pub struct ScriptedResolver {
    state: Arc<ResolverState>,
}

impl ScriptedResolver {
    /// `name` is a premium account.
    pub fn premium(&self, name: &str) -> &Self {
        self.state
            .premium
            .lock()
            .unwrap()
            .insert(name.to_string(), profile(name));
        self
    }

    /// Lookups of `name` fail.
    pub fn failing(&self, name: &str) -> &Self {
        self.state.failing.lock().unwrap().insert(name.to_string());
        self
    }

    /// Lookups of `name` panic.
    pub fn panicking(&self, name: &str) -> &Self {
        self.state.panicking.lock().unwrap().insert(name.to_string());
        self
    }

    /// Lookups of `name` wait until the returned `Notify` fires.
    pub fn block(&self, name: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.state
            .blocked
            .lock()
            .unwrap()
            .insert(name.to_string(), notify.clone());
        notify
    }

    /// `has_joined` answers "unknown join" from now on.
    pub fn refuse_joins(&self) {
        self.state.refuse_joins.store(true, Ordering::SeqCst);
    }

    /// `has_joined` panics from now on.
    pub fn panic_on_join(&self) {
        self.state.panic_on_join.store(true, Ordering::SeqCst);
    }

    /// Every `(username, server_hash)` passed to `has_joined`.
    pub fn joins(&self) -> Vec<(String, String)> {
        self.state.joins.lock().unwrap().clone()
    }
}

impl ProfileResolver for ScriptedResolver {
    async fn resolve_premium(
        &self,
        username: &str,
    ) -> Result<Option<PremiumProfile>, ResolveError> {
        let blocker = self.state.blocked.lock().unwrap().get(username).cloned();
        if let Some(blocker) = blocker {
            blocker.notified().await;
        }
        if self.state.panicking.lock().unwrap().contains(username) {
            panic!("profile client bug while looking up {username}");
        }
        if self.state.failing.lock().unwrap().contains(username) {
            return Err(ResolveError::Unavailable("connection reset".into()));
        }
        Ok(self.state.premium.lock().unwrap().get(username).cloned())
    }

    async fn has_joined(
        &self,
        username: &str,
        server_hash: &str,
    ) -> Result<Option<PremiumProfile>, ResolveError> {
        self.state
            .joins
            .lock()
            .unwrap()
            .push((username.to_string(), server_hash.to_string()));
        if self.state.panic_on_join.load(Ordering::SeqCst) {
            panic!("profile client bug while checking join of {username}");
        }
        if self.state.refuse_joins.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(self.state.premium.lock().unwrap().get(username).cloned())
    }
}

// =========================================================================
// Harness
// =========================================================================

/// A listener wired to the mocks above.
pub struct Harness {
    pub listener: LoginListener<ScriptedResolver>,
    pub resolver: ScriptedResolver,
    pub gate: Arc<RecordingGate>,
    next_event: AtomicU64,
}

impl Harness {
    /// Default config, auth backend present. Must run inside a runtime.
    pub fn new() -> Self {
        Self::with_builder(LoginListener::<ScriptedResolver>::builder())
    }

    pub fn with_config(config: ListenerConfig) -> Self {
        Self::with_builder(LoginListener::<ScriptedResolver>::builder().config(config))
    }

    pub fn with_builder(builder: LoginListenerBuilder) -> Self {
        let resolver = ScriptedResolver::default();
        let listener = builder
            .key_pair(test_keys())
            .auth_backend_available(true)
            .build(resolver.clone())
            .unwrap();
        Self {
            listener,
            resolver,
            gate: Arc::new(RecordingGate::default()),
            next_event: AtomicU64::new(1),
        }
    }

    pub fn event(
        &self,
        connection: &Arc<RecordingConnection>,
        packet: ClientLoginPacket,
    ) -> PacketEvent<RecordingConnection> {
        let id = EventId::new(self.next_event.fetch_add(1, Ordering::SeqCst));
        PacketEvent::new(id, connection.clone(), packet, self.gate.clone())
    }

    pub fn login_start(&self, connection: &Arc<RecordingConnection>, username: &str) -> Dispatch {
        let event = self.event(
            connection,
            ClientLoginPacket::LoginStart {
                username: username.to_string(),
            },
        );
        self.listener.on_packet(event)
    }

    /// Answers an encryption request the way a real client does.
    pub fn respond(
        &self,
        connection: &Arc<RecordingConnection>,
        shared_secret: &[u8],
        verify_token: &[u8],
    ) -> Dispatch {
        let key = self.listener.public_key_der();
        self.respond_raw(
            connection,
            client_encrypt(key, shared_secret).unwrap(),
            client_encrypt(key, verify_token).unwrap(),
        )
    }

    pub fn respond_raw(
        &self,
        connection: &Arc<RecordingConnection>,
        shared_secret: Vec<u8>,
        verify_token: Vec<u8>,
    ) -> Dispatch {
        let event = self.event(
            connection,
            ClientLoginPacket::EncryptionResponse {
                shared_secret,
                verify_token,
            },
        );
        self.listener.on_packet(event)
    }

    /// Runs a full name check and returns its outcome.
    pub async fn name_check(
        &self,
        connection: &Arc<RecordingConnection>,
        username: &str,
    ) -> NameCheckOutcome {
        expect_name_check(self.login_start(connection, username))
            .outcome()
            .await
            .unwrap()
    }

    /// Runs a full verification with the given plaintext answers.
    pub async fn verify(
        &self,
        connection: &Arc<RecordingConnection>,
        shared_secret: &[u8],
        verify_token: &[u8],
    ) -> VerifyOutcome {
        expect_verify(self.respond(connection, shared_secret, verify_token))
            .outcome()
            .await
            .unwrap()
    }
}

pub fn expect_name_check(dispatch: Dispatch) -> LoginTask<NameCheckOutcome> {
    match dispatch {
        Dispatch::NameCheck(task) => task,
        other => panic!("expected a name check, got {other:?}"),
    }
}

pub fn expect_verify(dispatch: Dispatch) -> LoginTask<VerifyOutcome> {
    match dispatch {
        Dispatch::Verify(task) => task,
        other => panic!("expected a verification, got {other:?}"),
    }
}

pub const SECRET: [u8; 16] = *b"0123456789abcdef";

//! A connection storm against a Gatekeep listener, with every outside
//! collaborator simulated in memory.
//!
//! Usage: `login-storm [config.json] [players]`

use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gatekeep::prelude::*;
use gatekeep_crypto::{client_encrypt, server_hash, verify_token, SHARED_SECRET_LEN};
use tokio::task::JoinSet;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Simulated profile + session service
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ServiceState {
    accounts: HashMap<String, PremiumProfile>,
    joins: Mutex<HashSet<(String, String)>>,
}

/// Knows a few premium accounts and remembers which joins clients
/// announced.
#[derive(Clone, Default)]
struct SessionService {
    state: Arc<ServiceState>,
}

impl SessionService {
    fn with_accounts(names: &[&str]) -> Self {
        let accounts = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let profile = PremiumProfile {
                    id: Uuid::from_u128(i as u128 + 1),
                    name: name.to_string(),
                };
                (name.to_string(), profile)
            })
            .collect();
        Self {
            state: Arc::new(ServiceState {
                accounts,
                joins: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// What an honest client does before answering the challenge.
    fn join(&self, username: &str, server_hash: &str) {
        if let Ok(mut joins) = self.state.joins.lock() {
            joins.insert((username.to_string(), server_hash.to_string()));
        }
    }
}

impl ProfileResolver for SessionService {
    async fn resolve_premium(
        &self,
        username: &str,
    ) -> Result<Option<PremiumProfile>, ResolveError> {
        // Round trip to the profile service.
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(self.state.accounts.get(username).cloned())
    }

    async fn has_joined(
        &self,
        username: &str,
        server_hash: &str,
    ) -> Result<Option<PremiumProfile>, ResolveError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let joined = self
            .state
            .joins
            .lock()
            .map_err(|_| ResolveError::Unavailable("join log poisoned".into()))?
            .remove(&(username.to_string(), server_hash.to_string()));
        Ok(joined
            .then(|| self.state.accounts.get(username).cloned())
            .flatten())
    }
}

// ---------------------------------------------------------------------------
// Simulated packet framework
// ---------------------------------------------------------------------------

#[derive(Default)]
struct CountingGate {
    held: AtomicU64,
    released: AtomicU64,
}

impl PacketGate for CountingGate {
    fn hold(&self, _event: EventId) {
        self.held.fetch_add(1, Ordering::Relaxed);
    }

    fn release(&self, _event: EventId) {
        self.released.fetch_add(1, Ordering::Relaxed);
    }
}

struct DemoConnection {
    id: ConnectionId,
    origin: OriginKey,
    challenge: Mutex<Option<EncryptionRequest>>,
}

impl LoginConnection for DemoConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn origin(&self) -> OriginKey {
        self.origin
    }

    fn send_encryption_request(&self, request: EncryptionRequest) -> Result<(), InterceptError> {
        let mut slot = self
            .challenge
            .lock()
            .map_err(|_| InterceptError::SendFailed("outbox poisoned".into()))?;
        *slot = Some(request);
        Ok(())
    }

    fn complete_login(&self, identity: VerifiedIdentity) -> Result<(), InterceptError> {
        tracing::debug!(conn_id = %self.id, username = %identity.profile.name, "joined as premium");
        Ok(())
    }

    fn disconnect(&self, reason: &str) {
        tracing::debug!(conn_id = %self.id, reason, "kicked");
    }
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Behavior {
    /// Owns the account and follows the protocol.
    Honest,
    /// Claims a premium name but never talks to the session service.
    Impostor,
    /// Echoes a forged verify token.
    Tamperer,
    /// Not a premium name at all.
    Guest,
}

const PREMIUM: [&str; 4] = ["Steve", "Alex", "Notch", "jeb_"];

struct Storm {
    listener: LoginListener<SessionService>,
    service: SessionService,
    gate: Arc<CountingGate>,
    next_event: AtomicU64,
}

impl Storm {
    fn event(
        &self,
        conn: &Arc<DemoConnection>,
        packet: ClientLoginPacket,
    ) -> PacketEvent<DemoConnection> {
        let id = EventId::new(self.next_event.fetch_add(1, Ordering::Relaxed));
        PacketEvent::new(id, Arc::clone(conn), packet, self.gate.clone())
    }
}

async fn play(storm: Arc<Storm>, player: u64) -> Result<&'static str, GatekeepError> {
    let behavior = match player % 4 {
        0 => Behavior::Honest,
        1 => Behavior::Impostor,
        2 => Behavior::Tamperer,
        _ => Behavior::Guest,
    };
    let username = match behavior {
        Behavior::Guest => format!("guest{player}"),
        _ => PREMIUM[(player as usize / 4) % PREMIUM.len()].to_string(),
    };

    let octets = player.to_be_bytes();
    let addr = SocketAddr::from(([10, 0, octets[6], octets[7]], 40_000 + (player % 20_000) as u16));
    let conn = Arc::new(DemoConnection {
        id: ConnectionId::new(player),
        origin: OriginKey(addr),
        challenge: Mutex::new(None),
    });

    let start = storm.event(&conn, ClientLoginPacket::LoginStart { username: username.clone() });
    let outcome = match storm.listener.on_packet(start) {
        Dispatch::NameCheck(task) => task.outcome().await?,
        Dispatch::Dropped(_) => return Ok("dropped"),
        Dispatch::Ignored(_) | Dispatch::Verify(_) => return Ok("ignored"),
    };
    if outcome != NameCheckOutcome::Challenged {
        return Ok("offline");
    }

    let challenge = conn.challenge.lock().ok().and_then(|mut slot| slot.take());
    let Some(request) = challenge else {
        return Ok("offline");
    };
    let secret = verify_token(SHARED_SECRET_LEN);
    let hash = server_hash(&request.server_id, &secret, &request.public_key);
    if !matches!(behavior, Behavior::Impostor) {
        storm.service.join(&username, &hash);
    }
    let token: Vec<u8> = match behavior {
        Behavior::Tamperer => request.verify_token.iter().map(|b| b ^ 0x5a).collect(),
        _ => request.verify_token.clone(),
    };

    let response = storm.event(
        &conn,
        ClientLoginPacket::EncryptionResponse {
            shared_secret: client_encrypt(&request.public_key, &secret)?,
            verify_token: client_encrypt(&request.public_key, &token)?,
        },
    );
    match storm.listener.on_packet(response) {
        Dispatch::Verify(task) => match task.outcome().await? {
            VerifyOutcome::Verified(_) => Ok("verified"),
            VerifyOutcome::Denied(LoginError::TokenMismatch) => Ok("denied: token mismatch"),
            VerifyOutcome::Denied(LoginError::JoinNotConfirmed) => Ok("denied: join not confirmed"),
            VerifyOutcome::Denied(_) => Ok("denied: other"),
        },
        _ => Ok("ignored"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    gatekeep::telemetry::init()?;

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => ListenerConfig {
            admission: AdmissionConfig::per_window(150, Duration::from_secs(60)),
            ..ListenerConfig::default()
        },
    };
    let players: u64 = match args.next() {
        Some(n) => n.parse()?,
        None => 200,
    };

    let service = SessionService::with_accounts(&PREMIUM);
    let listener = LoginListener::<SessionService>::builder()
        .config(config)
        .auth_backend_available(true)
        .build(service.clone())?;

    let storm = Arc::new(Storm {
        listener,
        service,
        gate: Arc::new(CountingGate::default()),
        next_event: AtomicU64::new(1),
    });

    tracing::info!(players, "starting login storm");
    let mut tasks = JoinSet::new();
    for player in 0..players {
        tasks.spawn(play(Arc::clone(&storm), player));
    }

    let mut tally: BTreeMap<&'static str, u64> = BTreeMap::new();
    while let Some(result) = tasks.join_next().await {
        let label = match result {
            Ok(Ok(label)) => label,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "player failed");
                "error"
            }
            Err(e) => {
                tracing::warn!(error = %e, "player task panicked");
                "error"
            }
        };
        *tally.entry(label).or_default() += 1;
    }

    for (label, count) in &tally {
        println!("{label:>28}: {count}");
    }
    let stats = storm.listener.admission_stats();
    println!(
        "admission: {} admitted, {} rejected; holds: {} held, {} released; sessions left: {}",
        stats.admitted,
        stats.rejected,
        storm.gate.held.load(Ordering::Relaxed),
        storm.gate.released.load(Ordering::Relaxed),
        storm.listener.sessions().len(),
    );
    Ok(())
}

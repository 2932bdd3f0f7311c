//! # Gatekeep
//!
//! Premium-login interception for game servers.
//!
//! Gatekeep watches two login packets. On **login start** it asks the
//! central profile service whether the name is a premium account and, if
//! so, challenges the client with an encryption request. On **encryption
//! response** it checks that the client really owns the account before
//! letting the server continue with that identity. Both steps run on
//! tokio tasks while the packet is held, so the thread delivering packets
//! never waits on the network or on RSA.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gatekeep::prelude::*;
//!
//! // Implement ProfileResolver for your profile service client, then:
//! // let listener = LoginListenerBuilder::new()
//! //     .config(config)
//! //     .auth_backend_available(true)
//! //     .build(my_resolver)?;
//! // framework.register(listener.interests(), move |event| {
//! //     listener.on_packet(event);
//! // });
//! ```

mod config;
mod error;
mod listener;
mod name_check;
mod task;
pub mod telemetry;
mod verify;

pub use config::{ListenerConfig, MAX_VERIFY_TOKEN_LEN, MIN_KEY_BITS};
pub use error::{GatekeepError, LoginError};
pub use listener::{Dispatch, IgnoreReason, ListenerPhase, LoginListener, LoginListenerBuilder};
pub use name_check::NameCheckOutcome;
pub use task::LoginTask;
pub use verify::VerifyOutcome;

/// Everything an embedding server usually needs.
pub mod prelude {
    pub use crate::{
        Dispatch, GatekeepError, IgnoreReason, ListenerConfig, LoginError, LoginListener,
        LoginListenerBuilder, NameCheckOutcome, VerifyOutcome,
    };
    pub use gatekeep_intercept::{
        ConnectionId, EventId, InterceptError, LoginConnection, PacketEvent, PacketGate,
    };
    pub use gatekeep_limit::AdmissionConfig;
    pub use gatekeep_protocol::{
        ClientLoginPacket, EncryptionRequest, OriginKey, PremiumProfile, VerifiedIdentity,
    };
    pub use gatekeep_session::{ProfileResolver, ResolveError};
}

//! In-flight login sessions for Gatekeep.
//!
//! This crate tracks logins between the two intercepted packets:
//!
//! 1. **Profile resolution**: asking the central service whether a name
//!    is a premium account ([`ProfileResolver`] trait)
//! 2. **Session tracking**: remembering, per connection origin, what we
//!    challenged the client with ([`SessionRegistry`])
//! 3. **Expiry**: forgetting abandoned handshakes after a fixed timeout
//!
//! # How it fits in the stack
//!
//! ```text
//! Listener + tasks (above)  ← start sessions on login start, consume them on response
//!     ↕
//! Session Layer (this crate)  ← one session per origin, bounded lifetime
//!     ↕
//! Protocol / intercept (below)  ← OriginKey, ConnectionId, PremiumProfile
//! ```

mod error;
mod registry;
mod resolver;
mod session;

pub use error::SessionError;
pub use registry::SessionRegistry;
pub use resolver::{ProfileResolver, ResolveError};
pub use session::{AttemptTicket, LoginSession, SessionConfig, SessionKind};

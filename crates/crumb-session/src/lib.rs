//! # crumb-session
//!
//! Stateless sessions carried in a signed cookie.
//!
//! The server keeps no session store: the whole claim set travels in the
//! cookie as a signed token, and every request re-verifies it.
//!
//! ## Request States
//!
//! | State | Cookie | Outcome |
//! |-------|--------|---------|
//! | **Absent** | missing | fresh session issued |
//! | **Invalid** | malformed, tampered, other method | error, never replaced |
//! | **Live** | verified and in its window | TTL re-applied (sliding) |
//! | **Renewed** | verified but expired or not yet active | fresh session issued |

pub mod clock;
pub mod cookie;
pub mod error;
pub mod handler;

pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::cookie::{CookieFactory, CookieTransport};
pub use crate::error::{ErrorKind, SessionError};
pub use crate::handler::{SessionHandler, SessionState};

//! Fabric Network API
//!
//! Request-time entry points of the isolation engine: validated enqueue of
//! connect, detach and revert requests, status polling, channel listing and
//! switch/port registration.

pub mod context;
pub mod networking;


pub use context::AppContext;
pub use networking::{NetworkingApi, PortReport};

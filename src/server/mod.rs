//! Connection acceptor, TLS setup, and request dispatch.

pub mod listener;
pub mod registry;
pub mod router;
pub mod tls;

pub use listener::Server;

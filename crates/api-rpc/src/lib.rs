//! JSON-RPC API Layer
//!
//! Implements the JSON-RPC 2.0 server for the Waitline virtual queue.
//! Method names carry a version suffix (`queue.join.v1`) so the contract
//! can evolve without breaking older clients.

pub mod error;
pub mod handler;
pub mod rate_limiter;
pub mod server;
pub mod types;

pub use handler::{RpcHandler, RpcServices};
pub use server::{RpcServer, RpcServerConfig};

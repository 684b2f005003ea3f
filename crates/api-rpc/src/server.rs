//! JSON-RPC Server
//!
//! Serves JSON-RPC 2.0 over HTTP on localhost.

use crate::handler::{RpcHandler, RpcServices};
use crate::types::{
    FeedbackListRequest, FeedbackRequest, FindRequest, JoinRequest, LeaveRequest,
    PositionRequest, RegisterRequest, ServeRequest, SnapshotRequest, StatsRequest,
};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9527;
const DEFAULT_RATE_LIMIT_BURST: u32 = 200;
const DEFAULT_RATE_LIMIT_PER_SEC: u32 = 100;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
    pub rate_limit_burst: u32,
    pub rate_limit_per_sec: u32,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
            rate_limit_burst: DEFAULT_RATE_LIMIT_BURST,
            rate_limit_per_sec: DEFAULT_RATE_LIMIT_PER_SEC,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

/// Register `$method` as an async method that parses `$request` and calls `$call`
macro_rules! register {
    ($module:expr, $method:literal, $request:ty, $call:ident) => {
        $module
            .register_async_method($method, |params, handler, _| async move {
                let req: $request = params.parse()?;
                handler.$call(req).await
            })
            .map_err(|e| e.to_string())?;
    };
    // Params may be omitted entirely when every field has a default
    ($module:expr, $method:literal, $request:ty, $call:ident, optional) => {
        $module
            .register_async_method($method, |params, handler, _| async move {
                let req: $request = params.parse::<Option<$request>>()?.unwrap_or_default();
                handler.$call(req).await
            })
            .map_err(|e| e.to_string())?;
    };
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, services: RpcServices) -> Self {
        let handler = Arc::new(RpcHandler::new(
            services,
            config.rate_limit_burst,
            config.rate_limit_per_sec,
        ));
        Self { config, handler }
    }

    /// Build the method table
    pub fn module(&self) -> Result<RpcModule<RpcHandler>, String> {
        let mut module = RpcModule::from_arc(self.handler.clone());

        // Registry
        register!(module, "destination.register.v1", RegisterRequest, register);
        register!(module, "destination.find.v1", FindRequest, find, optional);
        register!(module, "destination.serve.v1", ServeRequest, serve);

        // Queue
        register!(module, "queue.join.v1", JoinRequest, join);
        register!(module, "queue.leave.v1", LeaveRequest, leave);
        register!(module, "queue.position.v1", PositionRequest, position);
        register!(module, "queue.snapshot.v1", SnapshotRequest, snapshot);

        // Feedback
        register!(module, "feedback.submit.v1", FeedbackRequest, submit_feedback);
        register!(module, "feedback.list.v1", FeedbackListRequest, list_feedback);

        // Admin
        register!(module, "admin.stats.v1", StatsRequest, stats, optional);

        Ok(module)
    }

    /// Start the JSON-RPC server
    ///
    /// Returns the bound address (useful with port 0) and the server handle.
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle), String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        let module = self.module()?;
        let handle = server.start(module);

        info!(addr = %local_addr, "JSON-RPC server started");
        Ok((local_addr, handle))
    }
}

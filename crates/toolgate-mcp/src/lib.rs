//! Toolgate MCP - the gateway's outer surfaces
//!
//! Exposes the dispatcher over HTTP (axum), over JSON-RPC 2.0 on `/rpc` or
//! stdio, and ships the builtin tool set the keyword routes point at.

pub mod http;
pub mod protocol;
pub mod rpc;
pub mod server;
pub mod tools;

pub use rpc::RpcHandler;
pub use server::StdioServer;

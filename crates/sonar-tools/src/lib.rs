//! SonarCloud tool catalogue + dispatch runtime.
//!
//! This crate is used by `sonar-mcp-server`, which wires [`dispatch::Dispatcher`] into an MCP
//! stdio transport. It contains **no** protocol framing: callers hand in a tool name and an
//! argument object and get a [`dispatch::ResultEnvelope`] back.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod registry;
pub mod request;
pub mod semantics;
pub mod shaping;

pub use config::SonarConfig;
pub use dispatch::{Dispatcher, ResultEnvelope};
pub use error::{Result, SonarToolsError};

//! Toolgate Core - tool registry, @keyword routing and dispatch
//!
//! A prompt such as `@psql SELECT * FROM users` is parsed for its `@keyword`,
//! the keyword selects a route, the route selects a registered tool and an
//! argument shape, and the dispatcher invokes the tool and wraps the outcome
//! in a uniform envelope.

pub mod adapter;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod registry;
pub mod router;
pub mod schema;

pub use config::Config;
pub use dispatch::{DirectOutcome, Dispatcher, PromptOutcome};
pub use error::{DispatchError, ToolError};
pub use registry::{ToolDescriptor, ToolHandler, ToolRegistry};
pub use router::{parse_keyword, ArgumentShape, KeywordRoute, ParsedPrompt, RouteTable};
pub use schema::{ParamKind, ParamSpec, ToolArgs};

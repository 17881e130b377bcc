//! Command line interface

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use toolgate_core::{Config, Dispatcher};
use toolgate_mcp::tools::builtin_registry;
use toolgate_mcp::{http, RpcHandler, StdioServer};

#[derive(Parser)]
#[command(name = "toolgate")]
#[command(about = "Tool gateway with @keyword prompt routing")]
#[command(version)]
#[command(after_help = "\
A prompt carries an @keyword that selects the tool to run; the rest of the
prompt becomes the tool's input.

EXAMPLES:
    toolgate serve --bind 0.0.0.0:8000
    toolgate query '@psql SELECT * FROM users'
    toolgate query '@diskusage /var'
    toolgate call get_disk_usage --path /var
    toolgate stdio                    # MCP over stdin/stdout")]
pub struct Cli {
    /// Config file (defaults to <config dir>/toolgate/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the HTTP gateway
    Serve {
        /// Address to listen on (overrides config)
        #[arg(long)]
        bind: Option<SocketAddr>,
    },

    /// Speak JSON-RPC over stdin/stdout
    Stdio,

    /// Route a prompt by its @keyword and print the result
    Query {
        /// Prompt containing an @keyword
        prompt: String,

        /// Extra parameters as a JSON object
        #[arg(long)]
        params: Option<String>,
    },

    /// Call a tool directly
    Call {
        /// Tool name to call
        tool: String,

        /// Arguments as JSON
        #[arg(long)]
        json_args: Option<String>,

        /// Tool arguments in --key value format
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// List registered tools
    Tools {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List keyword routes
    Keywords {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::resolve(cli.config.as_deref())?;
    let dispatcher = build_dispatcher(&config)?;

    match cli.command {
        Commands::Serve { bind } => cmd_serve(&config, bind, dispatcher).await,
        Commands::Stdio => StdioServer::new(RpcHandler::new(dispatcher)).run().await,
        Commands::Query { prompt, params } => {
            cmd_query(&dispatcher, &prompt, params.as_deref()).await
        }
        Commands::Call { tool, json_args, args } => {
            cmd_call(&dispatcher, &tool, json_args.as_deref(), &args).await
        }
        Commands::Tools { json } => cmd_tools(&dispatcher, json),
        Commands::Keywords { json } => cmd_keywords(&dispatcher, json),
    }
}

/// Builtin tools plus the configured route table
fn build_dispatcher(config: &Config) -> Result<Dispatcher> {
    let registry = builtin_registry(config).context("Failed to register builtin tools")?;
    let routes = config.route_table();

    for route in routes.routes() {
        if !registry.contains(&route.tool) {
            warn!("Route @{} points at unregistered tool '{}'", route.keyword, route.tool);
        }
    }

    for name in http::shadowed_tools(&registry) {
        warn!("Tool '{}' is shadowed by the fixed HTTP route /{}", name, name);
    }

    info!("{} tools, {} keyword routes", registry.len(), routes.len());

    Ok(Dispatcher::new(Arc::new(registry), Arc::new(routes))
        .with_fallback(config.fallback_on_mismatch))
}

async fn cmd_serve(
    config: &Config,
    bind: Option<SocketAddr>,
    dispatcher: Dispatcher,
) -> Result<()> {
    let addr = match bind {
        Some(addr) => addr,
        None => config
            .bind
            .parse()
            .with_context(|| format!("Invalid bind address: {}", config.bind))?,
    };

    http::serve(addr, dispatcher).await
}

async fn cmd_query(dispatcher: &Dispatcher, prompt: &str, params: Option<&str>) -> Result<()> {
    let params = match params {
        Some(raw) => parse_object(raw).context("Invalid --params")?,
        None => Map::new(),
    };

    let outcome = dispatcher.dispatch_prompt(prompt, params).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn cmd_call(
    dispatcher: &Dispatcher,
    tool: &str,
    json_args: Option<&str>,
    args: &[String],
) -> Result<()> {
    let mut arguments = match json_args {
        Some(raw) => parse_object(raw).context("Invalid --json-args")?,
        None => Map::new(),
    };
    arguments.extend(parse_arguments(args));

    let outcome = dispatcher.call_direct(tool, arguments).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn cmd_tools(dispatcher: &Dispatcher, json: bool) -> Result<()> {
    let tools = dispatcher.registry().list_all();

    if json {
        let listing: Vec<Value> = tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "description": t.description,
                    "params": t.parameters,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    let width = tools.iter().map(|t| t.name.len()).max().unwrap_or(0);
    for tool in tools {
        println!("{:width$}  {}", tool.name, tool.description, width = width);
    }
    Ok(())
}

fn cmd_keywords(dispatcher: &Dispatcher, json: bool) -> Result<()> {
    let routes = dispatcher.routes().routes();

    if json {
        println!("{}", serde_json::to_string_pretty(routes)?);
        return Ok(());
    }

    for route in routes {
        let marker = if dispatcher.registry().contains(&route.tool) {
            ""
        } else {
            "  (not registered)"
        };
        println!("@{:<12} -> {}{}", route.keyword, route.tool, marker);
    }
    Ok(())
}

fn parse_object(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str(raw)? {
        Value::Object(map) => Ok(map),
        other => bail!("expected a JSON object, got {}", other),
    }
}

/// Parse `--key value`, `--key=value` and bare `--flag` arguments
fn parse_arguments(args: &[String]) -> Map<String, Value> {
    let mut result = Map::new();
    let mut i = 0;

    while i < args.len() {
        if let Some(key) = args[i].strip_prefix("--") {
            if let Some((k, v)) = key.split_once('=') {
                result.insert(k.to_string(), parse_value(v));
            } else if i + 1 < args.len() && !args[i + 1].starts_with("--") {
                i += 1;
                result.insert(key.to_string(), parse_value(&args[i]));
            } else {
                result.insert(key.to_string(), Value::Bool(true));
            }
        }
        i += 1;
    }

    result
}

/// Parse a string value, trying JSON first
fn parse_value(s: &str) -> Value {
    serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string()))
}

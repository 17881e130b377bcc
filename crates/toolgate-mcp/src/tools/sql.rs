//! Read-only SQL tools
//!
//! Every statement goes through [`guard_sql`] first. PostgreSQL statements
//! run on a connection opened for that one call and torn down on every exit
//! path; the Vertica tool has no driver and only validates.

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_postgres::{NoTls, SimpleQueryMessage};
use toolgate_core::{ParamKind, ParamSpec, ToolArgs, ToolDescriptor, ToolError, ToolHandler};
use tracing::{debug, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

fn forbidden_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(insert|update|delete|drop|alter|truncate|create)\b")
            .expect("forbidden keyword pattern is valid")
    })
}

fn limit_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\blimit\b").expect("limit pattern is valid"))
}

/// Allow only SELECT statements without write keywords, and cap the row
/// count with a LIMIT clause when the statement has none.
pub fn guard_sql(sql: &str, max_limit: u64) -> Result<String, ToolError> {
    let sql = sql.trim();

    if !sql.to_lowercase().starts_with("select") {
        return Err(ToolError::Rejected("Only SELECT is allowed".to_string()));
    }

    if forbidden_pattern().is_match(sql) {
        return Err(ToolError::Rejected("Forbidden SQL keyword detected".to_string()));
    }

    if limit_pattern().is_match(sql) {
        Ok(sql.to_string())
    } else {
        Ok(format!("{} LIMIT {}", sql.trim_end_matches(';').trim_end(), max_limit))
    }
}

fn sql_params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::required("sql", ParamKind::String, "SQL SELECT statement"),
        ParamSpec::optional("limit", ParamKind::Integer, 100, "Max rows to return"),
    ]
}

/// Effective row cap: the requested limit bounded by the configured maximum
fn effective_limit(args: &ToolArgs, max_limit: u64) -> Result<u64, ToolError> {
    let requested = args.get_i64("limit").unwrap_or(100);
    if requested < 1 {
        return Err(ToolError::Rejected(format!("limit must be positive, got {}", requested)));
    }
    Ok((requested as u64).min(max_limit))
}

/// Aborts the connection driver task when the call ends, however it ends
struct ConnectionGuard(JoinHandle<()>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

struct PostgresQuery {
    url: Option<String>,
    max_limit: u64,
}

impl PostgresQuery {
    async fn run(&self, url: &str, sql: &str) -> Result<Vec<Map<String, Value>>, ToolError> {
        let connect = tokio_postgres::connect(url, NoTls);
        let (client, connection) = tokio::time::timeout(CONNECT_TIMEOUT, connect)
            .await
            .map_err(|_| ToolError::Failed("PostgreSQL connection timed out".to_string()))?
            .map_err(|e| ToolError::Failed(format!("PostgreSQL connection failed: {}", e)))?;

        let _guard = ConnectionGuard(tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!("PostgreSQL connection error: {}", e);
            }
        }));

        debug!("Running on PostgreSQL: {}", sql);
        let messages = client
            .simple_query(sql)
            .await
            .map_err(|e| ToolError::Failed(format!("PostgreSQL query failed: {}", e)))?;

        let rows = messages
            .into_iter()
            .filter_map(|message| match message {
                SimpleQueryMessage::Row(row) => {
                    let mut record = Map::new();
                    for (i, column) in row.columns().iter().enumerate() {
                        let value = row.get(i).map(Value::from).unwrap_or(Value::Null);
                        record.insert(column.name().to_string(), value);
                    }
                    Some(record)
                }
                _ => None,
            })
            .collect();

        Ok(rows)
    }
}

#[async_trait]
impl ToolHandler for PostgresQuery {
    async fn call(&self, args: ToolArgs) -> Result<Value, ToolError> {
        let limit = effective_limit(&args, self.max_limit)?;
        let sql = guard_sql(args.require_str("sql")?, limit)?;

        let url = self.url.as_deref().ok_or_else(|| {
            ToolError::Failed(
                "PostgreSQL is not configured (set postgres_url or TOOLGATE_POSTGRES_URL)"
                    .to_string(),
            )
        })?;

        let rows = self.run(url, &sql).await?;

        Ok(json!({
            "query": sql,
            "limit": limit,
            "count": rows.len(),
            "rows": rows,
        }))
    }
}

struct VerticaQuery {
    max_limit: u64,
}

#[async_trait]
impl ToolHandler for VerticaQuery {
    async fn call(&self, args: ToolArgs) -> Result<Value, ToolError> {
        let limit = effective_limit(&args, self.max_limit)?;
        let sql = guard_sql(args.require_str("sql")?, limit)?;

        Ok(json!({
            "query": sql,
            "limit": limit,
            "status": "validated only: no Vertica driver configured",
            "count": 0,
            "rows": [],
        }))
    }
}

pub fn postgres_query_tool(url: Option<String>, max_limit: u64) -> ToolDescriptor {
    ToolDescriptor::new(
        "postgres_query",
        "Execute a read-only query on PostgreSQL",
        sql_params(),
        PostgresQuery { url, max_limit },
    )
}

pub fn vertica_query_tool(max_limit: u64) -> ToolDescriptor {
    ToolDescriptor::new(
        "vertica_query",
        "Validate a read-only query for Vertica",
        sql_params(),
        VerticaQuery { max_limit },
    )
}

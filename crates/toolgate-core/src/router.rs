//! Keyword router - extracts `@keyword` intent from free text
//!
//! The route table binds each keyword to a tool name and to the
//! [`ArgumentShape`] that turns the rest of the prompt into arguments.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::info;

/// How the prompt remainder becomes tool arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ArgumentShape {
    /// The whole cleaned prompt is passed as `param`
    Remainder { param: String },
    /// The trimmed remainder is passed as `param` only when non-empty
    OptionalRemainder { param: String },
    /// The remainder is dropped
    Discard,
}

/// Static binding from a keyword to a tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRoute {
    pub keyword: String,
    pub tool: String,
    #[serde(flatten)]
    pub shape: ArgumentShape,
}

/// Result of [`parse_keyword`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPrompt {
    pub keyword: Option<String>,
    pub cleaned: String,
}

fn keyword_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"@(\w+)\s*").expect("keyword pattern is valid"))
}

/// Find the first `@token` in `prompt`.
///
/// The token is lower-cased. The cleaned prompt is the input with that first
/// marker and the whitespace run right after it removed; everything else is
/// left untouched, including any later `@tokens`.
pub fn parse_keyword(prompt: &str) -> ParsedPrompt {
    match keyword_pattern().captures(prompt) {
        Some(caps) => {
            let marker = caps.get(0).expect("group 0 always matches");
            let keyword = caps[1].to_lowercase();
            let mut cleaned = String::with_capacity(prompt.len());
            cleaned.push_str(&prompt[..marker.start()]);
            cleaned.push_str(&prompt[marker.end()..]);
            ParsedPrompt {
                keyword: Some(keyword),
                cleaned,
            }
        }
        None => ParsedPrompt {
            keyword: None,
            cleaned: prompt.to_string(),
        },
    }
}

fn route(keyword: &str, tool: &str, shape: ArgumentShape) -> KeywordRoute {
    KeywordRoute {
        keyword: keyword.to_string(),
        tool: tool.to_string(),
        shape,
    }
}

fn remainder(param: &str) -> ArgumentShape {
    ArgumentShape::Remainder {
        param: param.to_string(),
    }
}

fn optional_remainder(param: &str) -> ArgumentShape {
    ArgumentShape::OptionalRemainder {
        param: param.to_string(),
    }
}

/// Routes compiled into the gateway
pub fn builtin_routes() -> Vec<KeywordRoute> {
    vec![
        route("psql", "postgres_query", remainder("sql")),
        route("vertica", "vertica_query", remainder("sql")),
        route("osname", "get_os_name", ArgumentShape::Discard),
        route("sysinfo", "get_system_resources", ArgumentShape::Discard),
        route("diskusage", "get_disk_usage", optional_remainder("path")),
        route("diskcheck", "check_disk_space_warning", optional_remainder("path")),
        route("process", "get_process_info", ArgumentShape::Discard),
        route("rest", "rest_call", remainder("url")),
        route("hello", "hello", remainder("message")),
    ]
}

/// Ordered keyword -> route table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteTable {
    routes: Vec<KeywordRoute>,
}

impl RouteTable {
    pub fn new(routes: Vec<KeywordRoute>) -> Self {
        let mut table = Self::default();
        for route in routes {
            table.insert(route);
        }
        table
    }

    pub fn builtin() -> Self {
        Self::new(builtin_routes())
    }

    /// Builtin routes extended by `overrides`; an override with an existing
    /// keyword replaces that binding in place.
    pub fn with_overrides(overrides: Vec<KeywordRoute>) -> Self {
        let mut table = Self::builtin();
        for route in overrides {
            info!("Configured route @{} -> {}", route.keyword, route.tool);
            table.insert(route);
        }
        table
    }

    fn insert(&mut self, mut route: KeywordRoute) {
        route.keyword = route.keyword.to_lowercase();
        match self.routes.iter_mut().find(|r| r.keyword == route.keyword) {
            Some(existing) => *existing = route,
            None => self.routes.push(route),
        }
    }

    pub fn lookup(&self, keyword: &str) -> Option<&KeywordRoute> {
        self.routes.iter().find(|r| r.keyword == keyword)
    }

    /// Keywords in table order
    pub fn keywords(&self) -> Vec<String> {
        self.routes.iter().map(|r| r.keyword.clone()).collect()
    }

    pub fn routes(&self) -> &[KeywordRoute] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

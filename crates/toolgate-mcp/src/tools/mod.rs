//! Builtin tool set
//!
//! These are the collaborators behind the builtin keyword routes. Each tool
//! is registered explicitly; a name collision aborts startup.

pub mod greeting;
pub mod host;
pub mod rest;
pub mod sql;

use toolgate_core::{Config, DispatchError, ToolRegistry};

/// Registry holding every builtin tool, configured from `config`
pub fn builtin_registry(config: &Config) -> Result<ToolRegistry, DispatchError> {
    let mut registry = ToolRegistry::new();

    registry.register(greeting::hello_tool())?;
    registry.register(host::os_name_tool())?;
    registry.register(host::system_resources_tool())?;
    registry.register(host::disk_usage_tool())?;
    registry.register(host::disk_warning_tool(config.disk_warning_percent))?;
    registry.register(host::process_info_tool())?;
    registry.register(sql::vertica_query_tool(config.sql_max_limit))?;
    registry.register(sql::postgres_query_tool(
        config.postgres_url.clone(),
        config.sql_max_limit,
    ))?;
    registry.register(rest::rest_call_tool())?;

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolgate_core::RouteTable;

    #[test]
    fn test_every_builtin_route_has_a_tool() {
        let registry = builtin_registry(&Config::default()).unwrap();
        assert_eq!(registry.len(), 9);

        for route in RouteTable::builtin().routes() {
            assert!(
                registry.contains(&route.tool),
                "route @{} targets missing tool {}",
                route.keyword,
                route.tool
            );
        }
    }
}

//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::error::ConfigError;
use crate::config::schema::GatewayConfig;
use crate::config::validation::validate_config;

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = toml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn parses_routes_and_defaults() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "127.0.0.1:8080"

            [[routes]]
            id = "search"
            path = "/search"
            upstream = "http://localhost:8001"

            [[routes]]
            id = "delete-document"
            path = "/delete-document/{document_id}"
            upstream = "http://localhost:8003"
            timeout_ms = 5000
            group = "document-service"
            "#,
        )
        .unwrap();

        assert_eq!(config.routes.len(), 2);
        assert_eq!(config.routes[1].group.as_deref(), Some("document-service"));
        assert_eq!(config.routes[1].timeout_ms, Some(5000));
        assert_eq!(config.default_route_timeout(), Duration::from_secs(30));
        assert_eq!(config.fallback.generic_body, "Generic fallback");
        assert!(config.filters.request_id);
    }

    #[test]
    fn syntax_errors_are_parse_errors() {
        assert!(matches!(
            parse_config("[[routes]\nid = "),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn malformed_pattern_is_rejected() {
        let result = parse_config(
            r#"
            [[routes]]
            id = "broken"
            path = "/delete-document/{document_id"
            upstream = "http://localhost:8003"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::MalformedPattern { .. })));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            load_config(Path::new("/nonexistent/gateway.toml")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn bundled_config_is_valid() {
        let config = parse_config(include_str!("../../config/gateway.toml")).unwrap();
        assert_eq!(config.routes.len(), 9);
        assert!(config.fallback.expose_endpoints);
    }
}

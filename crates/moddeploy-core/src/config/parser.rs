//! TOML parser with helpful error messages

use super::schema::ConfigFile;
use anyhow::{Context, Result};
use std::path::Path;

/// Parse moddeploy.toml with detailed error messages
pub fn parse_config_toml(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config_toml_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse moddeploy.toml content from string
pub fn parse_config_toml_str(content: &str) -> Result<ConfigFile> {
    let config: ConfigFile =
        toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?;

    config.validate()?;

    Ok(config)
}

fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let line_num = error
        .span()
        .map(|span| content[..span.start.min(content.len())].lines().count().max(1));

    match line_num {
        Some(line_num) => anyhow::anyhow!(
            "TOML parsing error at line {}:\n{}\n\nError: {}",
            line_num,
            get_line_context(content, line_num),
            error.message()
        ),
        None => anyhow::anyhow!("TOML parsing error: {}", error),
    }
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2);
    let end = (line_num + 2).min(lines.len());

    lines[start.min(end)..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::ExecutionPolicy;

    #[test]
    fn test_parse_valid_config() {
        let toml = r#"
[install]
game_root = "C:/Games/Target"
markers = ["MicrosoftGame.Config", "Retail/HITMAN3.exe"]

[deploy]
policy = "strict"
concurrency = 8

[slots]
reserved_patch_min = 200
reserved_patch_max = 300
base_chunk_threshold = 27

[platforms]
"abc123" = "steam"
"#;

        let config = parse_config_toml_str(toml).unwrap();
        assert_eq!(config.deploy.policy, Some(ExecutionPolicy::Strict));
        assert_eq!(config.deploy.concurrency, Some(8));
        assert_eq!(config.slots.base_chunk_threshold, Some(27));
        assert_eq!(config.install.markers.as_ref().map(Vec::len), Some(2));
        assert_eq!(config.platforms.get("abc123").map(String::as_str), Some("steam"));
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config_toml_str("").unwrap();
        assert!(config.deploy.policy.is_none());
        assert!(config.platforms.is_empty());
    }

    #[test]
    fn test_parse_invalid_toml_reports_line() {
        let toml = "[deploy]\npolicy = \"strict\"\nconcurrency = \n";

        let err = parse_config_toml_str(toml).unwrap_err().to_string();
        assert!(err.contains("line"), "unexpected error: {err}");
    }

    #[test]
    fn test_inverted_reserved_range_rejected() {
        let toml = "[slots]\nreserved_patch_min = 300\nreserved_patch_max = 200\n";
        assert!(parse_config_toml_str(toml).is_err());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(parse_config_toml_str("[deploy]\nconcurrency = 0\n").is_err());
    }

    #[test]
    fn test_unknown_platform_name_rejected() {
        assert!(parse_config_toml_str("[platforms]\n\"ff\" = \"dreamcast\"\n").is_err());
    }
}

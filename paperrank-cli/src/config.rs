/// Config file loading and creation for the paperrank CLI.
///
/// Config lives at ~/.config/paperrank/config.toml.
/// All fields are optional. CLI args override config values.
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::bail;

#[derive(Deserialize, Default, Debug, PartialEq)]
pub struct PaperrankConfig {
    pub papers: Option<PathBuf>,
    pub state: Option<PathBuf>,
    pub mode: Option<String>,
    pub priority: Option<String>,
    pub n_match: Option<String>,
    pub top_n: Option<usize>,
}

const DEFAULT_CONFIG_TEMPLATE: &str = "\
# paperrank configuration
# All values here can be overridden by CLI flags.

# Paper catalog: a JSON array of {id, title, category} objects,
# or one paper per line as id<TAB>category<TAB>title
# papers = \"/path/to/papers.json\"

# Where ratings and history are stored
# (default: ~/.local/share/paperrank/state.json)
# state = \"/path/to/state.json\"

# Selection settings applied when a session first starts.
# Later changes made with `paperrank set` are kept in the state file.

# Selection mode: active, random, bubble, resolve_ties
# mode = \"active\"

# Pool ordering before selection: highest, lowest, random
# priority = \"highest\"

# Which comparison-count bucket to draw from: minimal, maximal, random
# n_match = \"minimal\"

# Bubble mode cutoff rank
# top_n = 30
";

fn home_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| bail("HOME environment variable not set"));
    PathBuf::from(home)
}

/// Returns the default config path: ~/.config/paperrank/config.toml
pub fn config_path() -> PathBuf {
    home_dir().join(".config").join("paperrank").join("config.toml")
}

/// Returns the default state path: ~/.local/share/paperrank/state.json
pub fn default_state_path() -> PathBuf {
    home_dir().join(".local").join("share").join("paperrank").join("state.json")
}

/// Parse config text. Kept separate from file IO so it can be tested.
pub fn parse_config(content: &str) -> Result<PaperrankConfig, toml::de::Error> {
    toml::from_str(content)
}

/// Load config from a file path. Returns default (all None) if file doesn't exist.
pub fn load_config(path: &Path) -> PaperrankConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_config(&content)
            .unwrap_or_else(|e| bail(format!("Failed to parse config at {}: {e}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => PaperrankConfig::default(),
        Err(e) => bail(format!("Failed to read config at {}: {e}", path.display())),
    }
}

/// Create the default config file at `path`. Errors if it already exists.
pub fn create_default_config(path: &Path) {
    if path.exists() {
        bail(format!("Config file already exists at {}", path.display()));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .unwrap_or_else(|e| bail(format!("Failed to create directory {}: {e}", parent.display())));
    }

    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE)
        .unwrap_or_else(|e| bail(format!("Failed to write config to {}: {e}", path.display())));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_to_empty_config() {
        let cfg = parse_config(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert_eq!(cfg, PaperrankConfig::default());
    }

    #[test]
    fn test_partial_config() {
        let cfg = parse_config("mode = \"bubble\"\ntop_n = 12\n").unwrap();
        assert_eq!(cfg.mode.as_deref(), Some("bubble"));
        assert_eq!(cfg.top_n, Some(12));
        assert!(cfg.papers.is_none());
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        assert!(parse_config("top_n = \"many\"").is_err());
    }

    #[test]
    fn test_create_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        create_default_config(&path);
        assert!(path.exists());
        assert_eq!(load_config(&path), PaperrankConfig::default());
    }

    #[test]
    fn test_missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_config(&dir.path().join("absent.toml")), PaperrankConfig::default());
    }
}

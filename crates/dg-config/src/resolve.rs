//! Configuration resolution and path discovery.
//!
//! A single `engine.json` is looked up from the most specific source to the
//! least specific one.

use std::path::{Path, PathBuf};

/// Discovered configuration file path.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// Path to engine.json (or None if not found).
    pub engine: Option<PathBuf>,

    /// Where the path came from (for diagnostics).
    pub source: ConfigSource,
}

/// Where a configuration file was found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via environment variable.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,

    /// Found in /etc/digit-gauss/.
    SystemConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::SystemConfig => write!(f, "system config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Environment variable names.
pub const ENV_CONFIG_PATH: &str = "DG_CONFIG";
pub const ENV_CONFIG_DIR: &str = "DG_CONFIG_DIR";

/// Standard config file name.
pub const ENGINE_FILENAME: &str = "engine.json";

/// Application name for XDG directories.
const APP_NAME: &str = "digit-gauss";

/// Resolve the engine configuration path.
///
/// The first existing file wins, in this order:
/// 1. explicit CLI path
/// 2. `DG_CONFIG`
/// 3. `DG_CONFIG_DIR`/engine.json
/// 4. `~/.config/digit-gauss/engine.json`
/// 5. `/etc/digit-gauss/engine.json`
///
/// With none present the built-in defaults apply.
pub fn resolve_config(cli_path: Option<&Path>) -> ConfigPaths {
    resolve_with(cli_path, |key| std::env::var_os(key).map(PathBuf::from))
}

fn resolve_with<F>(cli_path: Option<&Path>, env: F) -> ConfigPaths
where
    F: Fn(&str) -> Option<PathBuf>,
{
    let candidates = [
        (cli_path.map(Path::to_path_buf), ConfigSource::CliArgument),
        (env(ENV_CONFIG_PATH), ConfigSource::Environment),
        (
            env(ENV_CONFIG_DIR).map(|dir| dir.join(ENGINE_FILENAME)),
            ConfigSource::Environment,
        ),
        (
            xdg_config_dir().map(|dir| dir.join(ENGINE_FILENAME)),
            ConfigSource::XdgConfig,
        ),
        (
            Some(system_config_dir().join(ENGINE_FILENAME)),
            ConfigSource::SystemConfig,
        ),
    ];

    candidates
        .into_iter()
        .find_map(|(path, source)| path.filter(|p| p.is_file()).map(|p| (p, source)))
        .map(|(path, source)| ConfigPaths {
            engine: Some(path),
            source,
        })
        .unwrap_or_default()
}

/// Get the XDG config directory for digit-gauss.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Get the system config directory.
pub fn system_config_dir() -> PathBuf {
    PathBuf::from("/etc").join(APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_source_display() {
        assert_eq!(format!("{}", ConfigSource::CliArgument), "CLI argument");
        assert_eq!(
            format!("{}", ConfigSource::Environment),
            "environment variable"
        );
        assert_eq!(format!("{}", ConfigSource::XdgConfig), "XDG config");
        assert_eq!(format!("{}", ConfigSource::SystemConfig), "system config");
        assert_eq!(
            format!("{}", ConfigSource::BuiltinDefault),
            "builtin default"
        );
    }

    #[test]
    fn test_system_config_dir() {
        assert_eq!(system_config_dir(), PathBuf::from("/etc/digit-gauss"));
    }

    #[test]
    fn test_env_dir_used_when_no_cli_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ENGINE_FILENAME);
        std::fs::write(&path, "{}").unwrap();
        let dir_path = dir.path().to_path_buf();
        let paths = resolve_with(None, |key| {
            (key == ENV_CONFIG_DIR).then(|| dir_path.clone())
        });
        assert_eq!(paths.source, ConfigSource::Environment);
        assert_eq!(paths.engine, Some(path));
    }

    #[test]
    fn test_missing_cli_path_falls_through() {
        let dir = tempfile::tempdir().unwrap();
        let paths = resolve_with(Some(&dir.path().join("absent.json")), |_| None);
        assert_ne!(paths.source, ConfigSource::CliArgument);
    }

    #[test]
    fn test_existing_cli_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        std::fs::write(&path, "{}").unwrap();
        let paths = resolve_config(Some(&path));
        assert_eq!(paths.source, ConfigSource::CliArgument);
        assert_eq!(paths.engine, Some(path));
    }
}

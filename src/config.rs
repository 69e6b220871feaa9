use crate::pipeline::OrderingPolicy;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default model (optional)
    pub model: Option<String>,

    /// Provider identifier ("google" or "stub").
    pub provider: Option<String>,

    /// Per-request timeout in seconds; 0 disables it.
    pub request_timeout_secs: Option<u64>,

    pub ordering: Option<OrderingPolicy>,

    /// Write logs here instead of stderr.
    pub log_file: Option<PathBuf>,

    #[serde(default)]
    pub google: GoogleConfig,
}

#[derive(Clone, Serialize, Deserialize, Default)]
pub struct GoogleConfig {
    pub api_key: Option<String>,

    /// Override for the Generative Language API base URL.
    pub api_base: Option<String>,
}

// Keep the key out of debug logs.
impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl Config {
    /// Load config if the file exists, otherwise return Ok(None).
    pub fn load_optional(path: impl AsRef<Path>) -> anyhow::Result<Option<Self>> {
        let path = path.as_ref();
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(anyhow::Error::new(e))
                    .with_context(|| format!("failed to read config: {}", path.display()))
            }
        };

        let s = String::from_utf8(bytes).context("config is not valid UTF-8")?;
        let cfg: Config = toml::from_str(&s)
            .with_context(|| format!("failed to parse TOML: {}", path.display()))?;
        Ok(Some(cfg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_optional(dir.path().join("config.toml")).unwrap();
        assert!(cfg.is_none());
    }

    #[test]
    fn parses_all_fields() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(
            f,
            r#"
model = "gemini-1.5-flash"
provider = "stub"
request_timeout_secs = 15
ordering = "last-completion"
log_file = "/tmp/gemini-chat.log"

[google]
api_key = "secret"
api_base = "http://localhost:9000/"
"#
        )
        .unwrap();

        let cfg = Config::load_optional(f.path()).unwrap().unwrap();
        assert_eq!(cfg.model.as_deref(), Some("gemini-1.5-flash"));
        assert_eq!(cfg.provider.as_deref(), Some("stub"));
        assert_eq!(cfg.request_timeout_secs, Some(15));
        assert_eq!(cfg.ordering, Some(OrderingPolicy::LastCompletion));
        assert_eq!(cfg.log_file, Some(PathBuf::from("/tmp/gemini-chat.log")));
        assert_eq!(cfg.google.api_key.as_deref(), Some("secret"));
        assert_eq!(cfg.google.api_base.as_deref(), Some("http://localhost:9000/"));
        assert!(!format!("{cfg:?}").contains("secret"));
    }

    #[test]
    fn bad_toml_reports_path() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "model = ").unwrap();
        let err = Config::load_optional(f.path()).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse TOML"));
    }
}

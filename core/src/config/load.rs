use std::path::Path;

use anyhow::Context;

use super::types::AppConfig;

pub const DEFAULT_CONFIG_FILE: &str = "page_state.toml";

pub fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<AppConfig> {
    let path = path.as_ref();
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let mut cfg = toml::from_str::<AppConfig>(&s)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    apply_env_overrides(&mut cfg)?;
    Ok(cfg)
}

/// `./page_state.toml` if present, else defaults; environment overrides last.
pub fn load_default() -> anyhow::Result<AppConfig> {
    let local_config = Path::new(DEFAULT_CONFIG_FILE);
    if local_config.exists() {
        return load_from_path(local_config);
    }
    let mut cfg = AppConfig::default();
    apply_env_overrides(&mut cfg)?;
    Ok(cfg)
}

fn apply_env_overrides(cfg: &mut AppConfig) -> anyhow::Result<()> {
    if let Ok(v) = std::env::var("PAGE_STATE_KEY_PREFIX") {
        if !v.trim().is_empty() {
            cfg.persistence.key_prefix = v;
        }
    }
    if let Ok(v) = std::env::var("PAGE_STATE_DEFAULT_TTL") {
        if !v.trim().is_empty() {
            let ttl = v
                .trim()
                .parse::<u64>()
                .with_context(|| format!("PAGE_STATE_DEFAULT_TTL is not a number: {v}"))?;
            cfg.persistence.default_ttl = Some(ttl);
        }
    }
    if let Ok(v) = std::env::var("PAGE_STATE_SESSION_ID") {
        if !v.trim().is_empty() {
            cfg.persistence.session_id = Some(v);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_toml_with_defaults_for_missing_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[persistence]\nenabled = true\ndefault_ttl = 600\n\n[logging]\nlevel = \"debug\""
        )
        .unwrap();

        let cfg = load_from_path(file.path()).unwrap();
        assert!(cfg.persistence.enabled);
        assert_eq!(cfg.persistence.default_ttl, Some(600));
        assert_eq!(cfg.persistence.key_prefix, "st_page_state");
        assert_eq!(cfg.logging.level, "debug");
        assert!(cfg.logging.console);
    }

    #[test]
    fn class_config_defaults_are_selfish_and_restoring() {
        let cfg: super::super::ClassConfig = toml::from_str("url_prefix = \"pf_\"").unwrap();
        assert_eq!(cfg.url_prefix, "pf_");
        assert!(cfg.url_selfish);
        assert!(cfg.ignore_none_url);
        assert!(cfg.restore_url_on_touch);
        assert!(cfg.share_url_with.is_empty());
        assert_eq!(cfg.ttl, None);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_from_path("/definitely/not/here.toml").is_err());
    }
}

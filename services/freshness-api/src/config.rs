use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Longest share lifetime accepted from the environment (one year).
pub const MAX_SHARE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub model: String,
    pub inference_timeout: Duration,

    pub share_ttl: Duration,
    pub share_sweep_interval: Duration,
    pub public_base_url: String,
    pub bind_addr: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset.
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_api_key = get("OPENAI_API_KEY");
        let openai_base_url = get("OPENAI_BASE_URL").unwrap_or_else(|| "https://api.openai.com".to_string());

        // A fine-tuned model takes precedence over the base model.
        let model = get("OPENAI_FINETUNED_MODEL_ID")
            .or_else(|| get("OPENAI_MODEL"))
            .unwrap_or_else(|| "gpt-4o".to_string());

        let inference_timeout_secs = parse_u64(&get, "INFERENCE_TIMEOUT_SECS", 8)?;
        let share_ttl_secs = parse_u64(&get, "SHARE_TTL_SECS", 7 * 24 * 60 * 60)?;
        let share_sweep_secs = parse_u64(&get, "SHARE_SWEEP_INTERVAL_SECS", 60 * 60)?;

        let public_base_url = get("PUBLIC_BASE_URL").unwrap_or_else(|| "http://localhost:8080".to_string());
        let bind_addr = get("FRESHNESS_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());

        // Fail fast on values that would only surface at request time.
        if !is_http_url(&openai_base_url) {
            bail!("OPENAI_BASE_URL must start with http:// or https://");
        }
        if !is_http_url(&public_base_url) {
            bail!("PUBLIC_BASE_URL must start with http:// or https://");
        }
        if !(1..=60).contains(&inference_timeout_secs) {
            bail!("INFERENCE_TIMEOUT_SECS must be between 1 and 60");
        }
        if share_ttl_secs == 0 || share_sweep_secs == 0 {
            bail!("SHARE_TTL_SECS and SHARE_SWEEP_INTERVAL_SECS must be positive");
        }
        if share_ttl_secs > MAX_SHARE_TTL_SECS {
            bail!("SHARE_TTL_SECS must be at most {MAX_SHARE_TTL_SECS}");
        }

        Ok(Self {
            openai_api_key,
            openai_base_url,
            model,
            inference_timeout: Duration::from_secs(inference_timeout_secs),
            share_ttl: Duration::from_secs(share_ttl_secs),
            share_sweep_interval: Duration::from_secs(share_sweep_secs),
            public_base_url,
            bind_addr,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o".to_string(),
            inference_timeout: Duration::from_secs(8),
            share_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            share_sweep_interval: Duration::from_secs(60 * 60),
            public_base_url: "http://localhost:8080".to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

fn parse_u64(get: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64> {
    match get(key) {
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a non-negative integer, got {v:?}")),
        None => Ok(default),
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.openai_api_key, None);
        assert_eq!(cfg.model, "gpt-4o");
        assert_eq!(cfg.inference_timeout, Duration::from_secs(8));
        assert_eq!(cfg.share_ttl, Duration::from_secs(604_800));
        assert_eq!(cfg.share_sweep_interval, Duration::from_secs(3600));
        assert_eq!(cfg.public_base_url, "http://localhost:8080");
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
    }

    #[test]
    fn finetuned_model_overrides_base_model() {
        let cfg = load(&[("OPENAI_MODEL", "gpt-4o-mini"), ("OPENAI_FINETUNED_MODEL_ID", "ft:gpt-4o:produce")]).unwrap();
        assert_eq!(cfg.model, "ft:gpt-4o:produce");

        let cfg = load(&[("OPENAI_MODEL", "gpt-4o-mini"), ("OPENAI_FINETUNED_MODEL_ID", "  ")]).unwrap();
        assert_eq!(cfg.model, "gpt-4o-mini");
    }

    #[test]
    fn blank_values_count_as_unset() {
        let cfg = load(&[("OPENAI_API_KEY", ""), ("INFERENCE_TIMEOUT_SECS", " "), ("PUBLIC_BASE_URL", "\t")]).unwrap();
        assert_eq!(cfg.openai_api_key, None);
        assert_eq!(cfg.inference_timeout, Duration::from_secs(8));
        assert_eq!(cfg.public_base_url, "http://localhost:8080");
    }

    #[test]
    fn timeout_must_be_within_bounds() {
        assert!(load(&[("INFERENCE_TIMEOUT_SECS", "0")]).is_err());
        assert!(load(&[("INFERENCE_TIMEOUT_SECS", "61")]).is_err());
        assert!(load(&[("INFERENCE_TIMEOUT_SECS", "soon")]).is_err());
        assert_eq!(
            load(&[("INFERENCE_TIMEOUT_SECS", "60")]).unwrap().inference_timeout,
            Duration::from_secs(60)
        );
    }

    #[test]
    fn share_ttl_is_bounded() {
        assert!(load(&[("SHARE_TTL_SECS", "0")]).is_err());
        assert!(load(&[("SHARE_TTL_SECS", "10000000000000")]).is_err());
        assert!(load(&[("SHARE_TTL_SECS", MAX_SHARE_TTL_SECS.to_string().as_str())]).is_ok());
    }

    #[test]
    fn urls_must_be_http() {
        assert!(load(&[("OPENAI_BASE_URL", "ftp://example.com")]).is_err());
        assert!(load(&[("PUBLIC_BASE_URL", "fresh.example")]).is_err());
    }
}

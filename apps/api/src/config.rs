use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Built once at startup and handed to the router state; nothing reads env at call time.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared (server-managed) model credential. `None` means shared-key requests fail.
    pub shared_llm_api_key: Option<String>,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    /// Postgres for status checks. Falls back to the in-memory store when unset.
    pub database_url: Option<String>,
    /// Allowed CORS origins. A single `*` allows any origin.
    pub cors_origins: Vec<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            shared_llm_api_key: optional_env("SHARED_LLM_API_KEY"),
            llm_model: optional_env("LLM_MODEL")
                .unwrap_or_else(|| crate::llm_client::DEFAULT_MODEL.to_string()),
            llm_timeout_secs: optional_env("LLM_TIMEOUT_SECS")
                .map(|v| v.parse::<u64>())
                .transpose()
                .context("LLM_TIMEOUT_SECS must be a whole number of seconds")?
                .unwrap_or(120),
            database_url: optional_env("DATABASE_URL"),
            cors_origins: parse_origins(
                &optional_env("CORS_ORIGINS").unwrap_or_else(|| "*".to_string()),
            ),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// True when CORS should accept any origin.
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }
}

/// Reads an env var, treating an empty or whitespace-only value as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
impl Config {
    /// Configuration used by in-crate tests. No database, permissive CORS.
    pub fn for_tests(shared_llm_api_key: Option<&str>) -> Self {
        Config {
            shared_llm_api_key: shared_llm_api_key.map(String::from),
            llm_model: crate::llm_client::DEFAULT_MODEL.to_string(),
            llm_timeout_secs: 5,
            database_url: None,
            cors_origins: vec!["*".to_string()],
            port: 0,
            rust_log: "debug".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins_trims_whitespace() {
        let origins = parse_origins(" https://a.example , https://b.example,, ");
        assert_eq!(origins, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn test_wildcard_origin_allows_any() {
        let config = Config::for_tests(None);
        assert!(config.allows_any_origin());
    }

    #[test]
    fn test_explicit_origins_do_not_allow_any() {
        let mut config = Config::for_tests(None);
        config.cors_origins = parse_origins("https://app.example");
        assert!(!config.allows_any_origin());
    }
}

use std::{env, time::Duration};

const HOST: &str = "0.0.0.0";
const PORT: u16 = 8080;
const API_URL: &str = "http://localhost:5000";
const GENERATION_TIMEOUT_SECS: u64 = 60; // generation backends are slow
const LOCAL_DAY_COST: i64 = 5000;
const ML_GENERATE_PATH: &str = "/api/ml-itineraries/generate-ml";
const RULE_GENERATE_PATH: &str = "/api/itineraries/generate";
const ITINERARIES_PATH: &str = "/api/itineraries";
const SESSION_TTL_SECS: u64 = 60 * 60;

/// How long a wizard session may sit untouched before it is dropped.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(SESSION_TTL_SECS);

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub host: String,
    pub port: u16,
    pub api_url: String,
    pub api_token: Option<String>,
    pub generation_timeout: Duration,
    pub local_day_cost: i64,
    pub ml_generate_path: String,
    pub rule_generate_path: String,
    pub itineraries_path: String,
    pub session_ttl: Duration,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            host: HOST.to_string(),
            port: PORT,
            api_url: API_URL.to_string(),
            api_token: None,
            generation_timeout: Duration::from_secs(GENERATION_TIMEOUT_SECS),
            local_day_cost: LOCAL_DAY_COST,
            ml_generate_path: ML_GENERATE_PATH.to_string(),
            rule_generate_path: RULE_GENERATE_PATH.to_string(),
            itineraries_path: ITINERARIES_PATH.to_string(),
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }
}

impl PlannerConfig {
    /// Build the configuration from the process environment, falling back to
    /// defaults for anything missing or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT").unwrap_or(defaults.port),
            api_url: env::var("PLANNER_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            api_token: env::var("PLANNER_API_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty()),
            generation_timeout: parse_var("GENERATION_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.generation_timeout),
            local_day_cost: parse_var("LOCAL_DAY_COST").unwrap_or(defaults.local_day_cost),
            ml_generate_path: env::var("ML_GENERATE_PATH").unwrap_or(defaults.ml_generate_path),
            rule_generate_path: env::var("RULE_GENERATE_PATH")
                .unwrap_or(defaults.rule_generate_path),
            itineraries_path: env::var("ITINERARIES_PATH").unwrap_or(defaults.itineraries_path),
            session_ttl: parse_var("SESSION_TTL_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_ttl),
        }
    }

    /// Same as the defaults but pointed at a specific backend, used by tests
    /// and embedders that do not read the environment.
    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Self::default()
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.trim().parse().ok())
}

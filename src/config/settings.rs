use std::env;

use crate::error::MaintError;

pub const DEFAULT_DATABASE: &str = "flowitec_lms";
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub mongo_uri: String,
    pub database: String,
    pub api_base_url: String,
}

/// Values given on the command line. Each one stands in for its
/// environment variable.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub uri: Option<String>,
    pub database: Option<String>,
    pub api_base_url: Option<String>,
}

impl Overrides {
    fn get(&self, key: &str) -> Option<String> {
        match key {
            "MONGODB_URI" => self.uri.clone(),
            "MONGODB_DATABASE" => self.database.clone(),
            "LMS_API_URL" => self.api_base_url.clone(),
            _ => None,
        }
    }
}

impl Settings {
    /// Reads `.env` and the process environment, with `overrides` taking
    /// precedence over both.
    pub fn from_env(overrides: &Overrides) -> Result<Self, MaintError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| overrides.get(key).or_else(|| env::var(key).ok()))
    }

    /// Builds settings from any key lookup. The older script variable names
    /// (`MONGO_URL`, `DB_NAME`) are honoured after the primary ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MaintError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| lookup(*k))
                .find(|v| !v.trim().is_empty())
        };

        let mongo_uri = first(&["MONGODB_URI", "MONGO_URL"])
            .ok_or(MaintError::MissingConfig("MONGODB_URI"))?;
        let database = first(&["MONGODB_DATABASE", "DB_NAME"])
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());
        let api_base_url = first(&["LMS_API_URL"])
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Ok(Self {
            mongo_uri,
            database,
            api_base_url,
        })
    }
}

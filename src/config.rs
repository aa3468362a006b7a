use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub store_url: String,
    pub store_key: String,
    pub admin_username: String,
    pub admin_password: String,
    pub static_dir: Option<String>,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("CLINIC_PORT", "3000"),
            store_url: try_load("STORE_URL", "http://localhost:54321"),
            store_key: require("STORE_SERVICE_KEY"),
            admin_username: require("SEED_ADMIN_USER"),
            admin_password: require("SEED_ADMIN_PASS"),
            static_dir: optional("STATIC_DIR"),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

// Secrets never get a baked-in fallback.
fn require(key: &str) -> String {
    env::var(key)
        .map_err(|_| {
            warn!("Required environment variable {key} is not set");
        })
        .expect("Secrets misconfigured!")
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

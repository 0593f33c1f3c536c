//! Process configuration, read from `.env` and the environment.

use std::net::SocketAddr;

use anyhow::Context;

pub const DEFAULT_AVATAR_BASE_URL: &str = "https://api.dicebear.com/7.x/avataaars/svg";

#[derive(Clone, Debug)]
pub struct Config {
    /// sqlx connection string, e.g. `sqlite://chatline.db`
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    /// bcrypt work factor for stored passwords
    pub password_cost: u32,
    /// Avatars are `{avatar_base_url}?seed={name}`
    pub avatar_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://chatline.db".to_owned(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            max_connections: 16,
            password_cost: bcrypt::DEFAULT_COST,
            avatar_base_url: DEFAULT_AVATAR_BASE_URL.to_owned(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let database_url = dotenv::var("DATABASE_URL").unwrap_or(defaults.database_url);
        let bind_addr = match dotenv::var("BIND_ADDR") {
            Ok(addr) => addr.parse().with_context(|| format!("invalid BIND_ADDR {addr:?}"))?,
            Err(_) => defaults.bind_addr,
        };
        let max_connections = match dotenv::var("DATABASE_MAX_CONNECTIONS") {
            Ok(n) => n.parse().with_context(|| format!("invalid DATABASE_MAX_CONNECTIONS {n:?}"))?,
            Err(_) => defaults.max_connections,
        };
        let password_cost = match dotenv::var("PASSWORD_COST") {
            Ok(n) => n.parse().with_context(|| format!("invalid PASSWORD_COST {n:?}"))?,
            Err(_) => defaults.password_cost,
        };
        let avatar_base_url = dotenv::var("AVATAR_BASE_URL").unwrap_or(defaults.avatar_base_url);
        url::Url::parse(&avatar_base_url)
            .with_context(|| format!("invalid AVATAR_BASE_URL {avatar_base_url:?}"))?;

        Ok(Self {
            database_url,
            bind_addr,
            max_connections,
            password_cost,
            avatar_base_url,
        })
    }
}

use anyhow::Result;
use clap::Parser;
use crucible_core::auth::{
    IdentityProvider, NoIdentityProvider, SignedIdentityProvider, UserInfoIdentityProvider,
};
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_SSO_COOKIE: &str = "EAIT_WEB";

#[derive(Parser, Debug)]
#[command(name = "crucible")]
#[command(about = "Serves collection trees of learning resources")]
pub struct Cli {
    /// Listen address
    #[arg(short, long, default_value = "127.0.0.1:3000")]
    pub addr: String,

    /// Directory holding one JSON document per resource
    #[arg(short, long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Keep resources in memory only; nothing is written to disk
    #[arg(long)]
    pub memory: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// HS256 secret for admin session tokens.
    pub session_secret: String,
    pub sso_secret: Option<String>,
    pub sso_userinfo_url: Option<String>,
    pub sso_cookie: String,
}

impl Config {
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        let session_secret = non_empty("CRUCIBLE_SESSION_SECRET").unwrap_or_else(|| {
            tracing::warn!("CRUCIBLE_SESSION_SECRET not set, admin sessions are disabled");
            uuid::Uuid::new_v4().to_string()
        });
        Self {
            session_secret,
            sso_secret: non_empty("CRUCIBLE_SSO_SECRET"),
            sso_userinfo_url: non_empty("CRUCIBLE_SSO_USERINFO_URL"),
            sso_cookie: non_empty("CRUCIBLE_SSO_COOKIE")
                .unwrap_or_else(|| DEFAULT_SSO_COOKIE.to_string()),
        }
    }

    /// SSO backend: the user-info endpoint wins over a shared secret.
    pub fn identity_provider(&self) -> Arc<dyn IdentityProvider> {
        if let Some(url) = &self.sso_userinfo_url {
            Arc::new(UserInfoIdentityProvider::new(url.clone()))
        } else if let Some(secret) = &self.sso_secret {
            Arc::new(SignedIdentityProvider::new(secret.clone()))
        } else {
            tracing::info!("no SSO backend configured, protected resources stay locked");
            Arc::new(NoIdentityProvider)
        }
    }
}

pub fn load_config() -> Result<Config> {
    Ok(Config::from_lookup(|key| std::env::var(key).ok()))
}

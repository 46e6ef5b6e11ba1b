use std::path::PathBuf;

pub const DEFAULT_AUTH_COOKIE_NAME: &str = "clubsign_auth";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Holds the database file and the `uploads/` tree.
    pub root: PathBuf,
    pub app_name: String,
    pub vapid_private_key: Option<String>,
    pub vapid_public_key: Option<String>,
    pub vapid_subject: Option<String>,
    pub auth: AuthConfig,
    /// TOML file of accounts created at startup when missing.
    pub seed: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub key: String,
    pub token_ttl: time::Duration,
    pub cookie_name: String,
    pub cookie_secure: bool,
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root: "/".into(),
            app_name: "Clubsign".to_string(),
            vapid_private_key: None,
            vapid_public_key: None,
            vapid_subject: None,
            auth: AuthConfig {
                key: "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA".to_string(),
                token_ttl: time::Duration::days(14),
                cookie_name: DEFAULT_AUTH_COOKIE_NAME.to_string(),
                cookie_secure: false,
            },
            seed: None,
        }
    }
}

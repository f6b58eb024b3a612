//! Application configuration. Backend credentials, routes, guard and upload policy.

use crate::domain::DomainError;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_LOGIN_PATH: &str = "/admin/login";
pub const DEFAULT_ADMIN_HOME: &str = "/admin";

/// Session refresh lead time before the access token expires.
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Upload size cap for gallery images (5 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Supabase project URL. Read from FOLIO_SUPABASE_URL or SUPABASE_URL.
    #[serde(default)]
    pub supabase_url: Option<String>,

    /// Public anon key. Read from FOLIO_SUPABASE_ANON_KEY or SUPABASE_ANON_KEY.
    #[serde(default)]
    pub supabase_anon_key: Option<String>,

    #[serde(default)]
    pub login_path: Option<String>,

    #[serde(default)]
    pub admin_home: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Session guard
    // ─────────────────────────────────────────────────────────────────────────
    /// Extra attempts for the admin lookup before failing closed (default 0).
    #[serde(default)]
    pub authz_retries: Option<u32>,

    /// Delay between admin lookup attempts in ms (default 250).
    #[serde(default)]
    pub authz_retry_delay_ms: Option<u64>,

    /// Admin lookup timeout in ms. Unset = wait indefinitely (guard stays pending).
    #[serde(default)]
    pub authz_timeout_ms: Option<u64>,

    /// Refresh the session this many seconds before it expires (default 60).
    #[serde(default)]
    pub refresh_margin_secs: Option<u64>,

    // ─────────────────────────────────────────────────────────────────────────
    // Storage
    // ─────────────────────────────────────────────────────────────────────────
    #[serde(default)]
    pub max_upload_bytes: Option<usize>,

    /// Comma-separated bucket list tried in order for project covers.
    #[serde(default)]
    pub project_buckets: Option<String>,

    /// Bucket for gallery images and profile pictures.
    #[serde(default)]
    pub media_bucket: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Mail (Resend)
    // ─────────────────────────────────────────────────────────────────────────
    #[serde(default)]
    pub resend_api_key: Option<String>,

    #[serde(default)]
    pub resend_from_prod: Option<String>,

    #[serde(default)]
    pub resend_from_dev: Option<String>,

    /// "production" selects `resend_from_prod`.
    #[serde(default)]
    pub app_env: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, DomainError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("FOLIO"));
        if let Ok(path) = std::env::var("FOLIO_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        let mut cfg: Self = c
            .build()
            .and_then(|built| built.try_deserialize())
            .map_err(config_error)?;
        // Unprefixed names as used by the Supabase dashboard snippets
        if cfg.supabase_url.is_none() {
            cfg.supabase_url = std::env::var("SUPABASE_URL").ok();
        }
        if cfg.supabase_anon_key.is_none() {
            cfg.supabase_anon_key = std::env::var("SUPABASE_ANON_KEY").ok();
        }
        if cfg.resend_api_key.is_none() {
            cfg.resend_api_key = std::env::var("RESEND_API_KEY").ok();
        }
        Ok(cfg)
    }

    /// Returns true if both Supabase URL and anon key are present.
    pub fn is_supabase_configured(&self) -> bool {
        self.supabase_url.as_deref().is_some_and(|s| !s.is_empty())
            && self.supabase_anon_key.as_deref().is_some_and(|s| !s.is_empty())
    }

    pub fn login_path_or_default(&self) -> String {
        self.login_path
            .clone()
            .unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_string())
    }

    pub fn admin_home_or_default(&self) -> String {
        self.admin_home
            .clone()
            .unwrap_or_else(|| DEFAULT_ADMIN_HOME.to_string())
    }

    pub fn authz_retries_or_default(&self) -> u32 {
        self.authz_retries.unwrap_or(0)
    }

    pub fn authz_retry_delay(&self) -> Duration {
        Duration::from_millis(self.authz_retry_delay_ms.unwrap_or(250))
    }

    pub fn authz_timeout(&self) -> Option<Duration> {
        self.authz_timeout_ms.map(Duration::from_millis)
    }

    pub fn refresh_margin(&self) -> Duration {
        self.refresh_margin_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REFRESH_MARGIN)
    }

    pub fn max_upload_bytes_or_default(&self) -> usize {
        self.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES)
    }

    /// Buckets for project covers, in fallback order. Defaults to `project-images`, `image`.
    pub fn project_buckets_or_default(&self) -> Vec<String> {
        let parsed: Vec<String> = self
            .project_buckets
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .collect();
        if parsed.is_empty() {
            vec!["project-images".to_string(), "image".to_string()]
        } else {
            parsed
        }
    }

    pub fn media_bucket_or_default(&self) -> String {
        self.media_bucket
            .clone()
            .unwrap_or_else(|| "images".to_string())
    }

    pub fn is_production(&self) -> bool {
        self.app_env.as_deref() == Some("production")
    }

    /// Sender address for the current environment.
    pub fn resend_from(&self) -> Option<String> {
        if self.is_production() {
            self.resend_from_prod.clone()
        } else {
            self.resend_from_dev.clone()
        }
    }

    /// Returns true if mail can be sent (API key and sender for this environment).
    pub fn is_mail_configured(&self) -> bool {
        self.resend_api_key.is_some() && self.resend_from().is_some()
    }
}

fn config_error(e: config::ConfigError) -> DomainError {
    DomainError::Config(e.to_string())
}

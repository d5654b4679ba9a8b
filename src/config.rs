use std::{env, fmt, str::FromStr, sync::Arc};

use anyhow::{Context, Result, anyhow, bail};
use chrono::Duration;

pub const DEFAULT_UPLOAD_API_BASE: &str = "https://api.cloudinary.com";
pub const DEFAULT_MAX_IMAGES: usize = 5;
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_COPY_STATUS_TTL_MS: i64 = 2000;
pub const DEFAULT_SESSION_IDLE_MINUTES: i64 = 60;
pub const DEFAULT_PORT: u16 = 8080;

/// Room for multipart boundaries and part headers on top of the file bytes.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Everything the process reads from its environment, loaded once at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub gate: GateSettings,
    pub store: StoreSettings,
    pub workflow: WorkflowSettings,
    pub max_image_bytes: usize,
    pub session_idle: Duration,
    pub port: u16,
}

/// Shared secret checked by the access gate.
#[derive(Clone)]
pub struct GateSettings {
    secret: Arc<str>,
}

impl GateSettings {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Arc::from(secret.into()),
        }
    }

    /// Plaintext exact comparison. This is not a security boundary.
    pub fn matches(&self, candidate: &str) -> bool {
        candidate == &*self.secret
    }
}

impl fmt::Debug for GateSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateSettings")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Destination of the outbound image transfers.
#[derive(Clone, Debug)]
pub struct StoreSettings {
    pub api_base: String,
    pub cloud_account_id: String,
    pub upload_preset: String,
}

#[derive(Clone, Debug)]
pub struct WorkflowSettings {
    pub max_images: usize,
    pub copy_status_ttl: Duration,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            max_images: DEFAULT_MAX_IMAGES,
            copy_status_ttl: Duration::milliseconds(DEFAULT_COPY_STATUS_TTL_MS),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let admin_password = required(&lookup, "ADMIN_PASSWORD")?;
        let upload_preset = required(&lookup, "UPLOAD_PRESET")?;
        let cloud_account_id = required(&lookup, "CLOUD_ACCOUNT_ID")?;

        let api_base = lookup("UPLOAD_API_BASE")
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_UPLOAD_API_BASE.to_string());

        let max_images: usize = parsed_or(&lookup, "MAX_IMAGES", DEFAULT_MAX_IMAGES)?;
        if max_images == 0 {
            bail!("MAX_IMAGES must be at least 1");
        }

        let max_image_bytes: usize =
            parsed_or(&lookup, "MAX_IMAGE_BYTES", DEFAULT_MAX_IMAGE_BYTES)?;
        if max_image_bytes == 0 {
            bail!("MAX_IMAGE_BYTES must be greater than 0");
        }

        let copy_ttl_ms: i64 =
            parsed_or(&lookup, "COPY_STATUS_TTL_MS", DEFAULT_COPY_STATUS_TTL_MS)?;
        if copy_ttl_ms < 0 {
            bail!("COPY_STATUS_TTL_MS must not be negative");
        }

        let idle_minutes: i64 =
            parsed_or(&lookup, "SESSION_IDLE_MINUTES", DEFAULT_SESSION_IDLE_MINUTES)?;
        if idle_minutes <= 0 {
            bail!("SESSION_IDLE_MINUTES must be greater than 0");
        }

        let port: u16 = parsed_or(&lookup, "PORT", DEFAULT_PORT)?;

        Ok(Self {
            gate: GateSettings::new(admin_password),
            store: StoreSettings {
                api_base,
                cloud_account_id,
                upload_preset,
            },
            workflow: WorkflowSettings {
                max_images,
                copy_status_ttl: Duration::milliseconds(copy_ttl_ms),
            },
            max_image_bytes,
            session_idle: Duration::minutes(idle_minutes),
            port,
        })
    }

    /// Upper bound for a single selection request body.
    pub fn max_request_bytes(&self) -> usize {
        self.max_image_bytes
            .saturating_mul(self.workflow.max_images)
            .saturating_add(MULTIPART_OVERHEAD_BYTES)
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key).ok_or_else(|| anyhow!("{key} env var is missing"))?;
    if value.is_empty() {
        bail!("{key} env var must not be empty");
    }
    Ok(value)
}

fn parsed_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        _ => Ok(default),
    }
}

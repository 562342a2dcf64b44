//! Deployment settings from environment variables (a `.env` file is honoured).
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `SUPABASE_URL`, `SUPABASE_ANON_KEY` | Hosted backend; both unset means demo mode |
//! | `NOTES_ENCRYPTION_KEY` | Passphrase the note key is derived from (required) |
//! | `HMS_ACCESS_KEY`, `HMS_SECRET_KEY`, `HMS_TEMPLATE_ID` | Video provider credentials |
//! | `HMS_API_URL` | Video API base, defaults to the public endpoint |
//! | `MINDCARE_CONFIG` | Path of the TOML tuning file, defaults to `mindcare.toml` |
//! | `BIND_ADDR` | Overrides `server.bind_addr` from the TOML file |

use std::path::Path;

use store::MindCareConfig;

use crate::error::ApiError;
use crate::video::VideoSettings;

#[derive(Clone, Debug, PartialEq)]
pub struct BackendSettings {
    pub url: String,
    pub anon_key: String,
}

#[derive(Clone, PartialEq)]
pub struct Settings {
    pub backend: Option<BackendSettings>,
    pub notes_passphrase: String,
    pub hms_access_key: Option<String>,
    pub hms_secret_key: Option<String>,
    pub hms_template_id: Option<String>,
    pub hms_api_url: Option<String>,
    pub config_path: String,
    pub bind_addr: Option<String>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("backend", &self.backend.as_ref().map(|b| &b.url))
            .field("video_configured", &self.hms_access_key.is_some())
            .field("config_path", &self.config_path)
            .field("bind_addr", &self.bind_addr)
            .finish_non_exhaustive()
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ApiError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let backend = match (get("SUPABASE_URL"), get("SUPABASE_ANON_KEY")) {
            (Some(url), Some(anon_key)) => Some(BackendSettings { url, anon_key }),
            (None, None) => None,
            _ => {
                return Err(ApiError::Config(
                    "SUPABASE_URL and SUPABASE_ANON_KEY must be set together".to_string(),
                ))
            }
        };

        let notes_passphrase = get("NOTES_ENCRYPTION_KEY")
            .ok_or_else(|| ApiError::Config("NOTES_ENCRYPTION_KEY must be set".to_string()))?;

        Ok(Self {
            backend,
            notes_passphrase,
            hms_access_key: get("HMS_ACCESS_KEY"),
            hms_secret_key: get("HMS_SECRET_KEY"),
            hms_template_id: get("HMS_TEMPLATE_ID"),
            hms_api_url: get("HMS_API_URL"),
            config_path: get("MINDCARE_CONFIG")
                .unwrap_or_else(|| MindCareConfig::filename().to_string()),
            bind_addr: get("BIND_ADDR"),
        })
    }

    /// Read the TOML tuning file; a missing file means defaults.
    pub fn load_config(&self) -> Result<MindCareConfig, ApiError> {
        let path = Path::new(&self.config_path);
        if !path.exists() {
            tracing::info!("No {} found, using default configuration", self.config_path);
            return Ok(MindCareConfig::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ApiError::Config(format!("Cannot read {}: {}", self.config_path, e)))?;
        let config = MindCareConfig::from_toml(&text)
            .map_err(|e| ApiError::Config(format!("Invalid {}: {}", self.config_path, e)))?;
        config
            .validate()
            .map_err(|e| ApiError::Config(format!("Invalid {}: {}", self.config_path, e)))?;
        Ok(config)
    }

    /// Video credentials, or `None` when they are missing or placeholders.
    pub fn video(&self, config: &MindCareConfig) -> Option<VideoSettings> {
        VideoSettings::from_parts(
            self.hms_access_key.clone(),
            self.hms_secret_key.clone(),
            self.hms_template_id.clone(),
            self.hms_api_url.clone(),
            &config.video.region,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_demo_mode_without_backend() {
        let settings = Settings::from_lookup(lookup(&[("NOTES_ENCRYPTION_KEY", "pass")])).unwrap();
        assert!(settings.backend.is_none());
        assert_eq!(settings.config_path, "mindcare.toml");
        assert!(settings.video(&MindCareConfig::default()).is_none());
    }

    #[test]
    fn test_missing_note_key_is_an_error() {
        let err = Settings::from_lookup(lookup(&[("NOTES_ENCRYPTION_KEY", "  ")])).unwrap_err();
        assert!(err.to_string().contains("NOTES_ENCRYPTION_KEY"));
    }

    #[test]
    fn test_half_configured_backend_is_an_error() {
        let result = Settings::from_lookup(lookup(&[
            ("NOTES_ENCRYPTION_KEY", "pass"),
            ("SUPABASE_URL", "https://demo.supabase.co"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_video_settings_use_configured_region() {
        let settings = Settings::from_lookup(lookup(&[
            ("NOTES_ENCRYPTION_KEY", "pass"),
            ("HMS_ACCESS_KEY", "key"),
            ("HMS_SECRET_KEY", "secret"),
            ("HMS_TEMPLATE_ID", "tmpl"),
        ]))
        .unwrap();
        let mut config = MindCareConfig::default();
        config.video.region = "eu".to_string();
        let video = settings.video(&config).unwrap();
        assert_eq!(video.region, "eu");
    }

    #[test]
    fn test_missing_config_file_is_default() {
        let mut settings = Settings::from_lookup(lookup(&[("NOTES_ENCRYPTION_KEY", "pass")])).unwrap();
        settings.config_path = "/nonexistent/mindcare.toml".to_string();
        assert_eq!(settings.load_config().unwrap(), MindCareConfig::default());
    }

    #[test]
    fn test_out_of_range_config_is_an_error() {
        let path = std::env::temp_dir().join(format!("mindcare-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[schedule]\njoin_late_minutes = 5000\n").unwrap();
        let mut settings = Settings::from_lookup(lookup(&[("NOTES_ENCRYPTION_KEY", "pass")])).unwrap();
        settings.config_path = path.to_string_lossy().into_owned();

        let err = settings.load_config().unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, ApiError::Config(_)));
        assert!(err.to_string().contains("join_late_minutes"));
    }
}

//! Lookup settings: the user preferences that steer which match wins.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::services::ServiceRegistry;

/// Preferences applied after the match cascade.
///
/// Loaded from a JSON file such as
/// `{"prefer_personal_media": true, "preferred_service_id": "jellyfin"}`;
/// every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupSettings {
    /// Narrow matches to self-hosted services when any are available
    pub prefer_personal_media: bool,
    /// Narrow matches to this service when any are available
    pub preferred_service_id: Option<String>,
    #[serde(rename = "personal_media_services")]
    pub services: ServiceRegistry,
}

impl LookupSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))
    }

    pub fn preferred_service_id(&self) -> Option<&str> {
        self.preferred_service_id.as_deref().filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = LookupSettings::default();
        assert!(!settings.prefer_personal_media);
        assert_eq!(settings.preferred_service_id(), None);
        assert!(settings.services.is_personal_media("jellyfin:audio:1"));
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"prefer_personal_media": true, "preferred_service_id": "navidrome"}}"#).unwrap();
        let settings = LookupSettings::load(file.path()).unwrap();
        assert!(settings.prefer_personal_media);
        assert_eq!(settings.preferred_service_id(), Some("navidrome"));
        // Registry falls back to the defaults
        assert!(settings.services.is_personal_media("emby:audio:1"));
    }

    #[test]
    fn test_load_custom_services() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"personal_media_services": ["mymusic"]}}"#).unwrap();
        let settings = LookupSettings::load(file.path()).unwrap();
        assert!(settings.services.is_personal_media("mymusic:track:1"));
        assert!(!settings.services.is_personal_media("jellyfin:audio:1"));
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = LookupSettings::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse settings file"));
    }
}

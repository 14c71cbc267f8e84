//! Service registry: which service a track came from, and whether that
//! service is a self-hosted personal media server.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Personal media services known out of the box.
pub const DEFAULT_PERSONAL_MEDIA_SERVICES: &[&str] = &[
    "ampache",
    "airsonic",
    "emby",
    "gonic",
    "jellyfin",
    "navidrome",
    "plex",
    "subsonic",
];

/// Service id of a service-qualified src: `"jellyfin:audio:1234"` → `"jellyfin"`.
/// Returns None when the src has no service prefix.
pub fn service_id(src: &str) -> Option<&str> {
    src.split_once(':')
        .map(|(service, _)| service)
        .filter(|service| !service.is_empty())
}

/// True if `src` belongs to the service `id`.
pub fn is_from_service(src: &str, id: &str) -> bool {
    src.strip_prefix(id).is_some_and(|rest| rest.starts_with(':'))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceRegistry {
    personal_media: FxHashSet<String>,
}

impl ServiceRegistry {
    pub fn new<I, S>(personal_media: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            personal_media: personal_media.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_personal_media_service(&self, service_id: &str) -> bool {
        self.personal_media.contains(service_id)
    }

    /// True if the track's src is prefixed by a personal media service id.
    pub fn is_personal_media(&self, src: &str) -> bool {
        service_id(src).is_some_and(|id| self.is_personal_media_service(id))
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_PERSONAL_MEDIA_SERVICES.iter().copied())
    }
}

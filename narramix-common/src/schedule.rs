//! Scheduled audio items and resource references
//!
//! [`ScheduledAudioItem`] is the unit the mixer consumes. Every item points at
//! an audio resource through a [`ResourceRef`] and carries its absolute
//! position on the shared timeline.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reference to an audio resource
///
/// Serialized untagged: a plain string is a location (URL, `file://` URL or
/// filesystem path), an object is an inline buffer identified by its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceRef {
    Location(String),
    Inline(InlineAudio),
}

/// Encoded audio held in memory (e.g. a synthesized narration blob)
///
/// The bytes are not serialized; only the id survives a JSON round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineAudio {
    pub id: Uuid,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,

    #[serde(skip)]
    pub bytes: Bytes,
}

impl ResourceRef {
    pub fn location(location: impl Into<String>) -> Self {
        ResourceRef::Location(location.into())
    }

    /// Wrap encoded bytes under a fresh id
    pub fn inline(bytes: impl Into<Bytes>, mime: Option<&str>) -> Self {
        ResourceRef::Inline(InlineAudio {
            id: Uuid::new_v4(),
            mime: mime.map(str::to_string),
            bytes: bytes.into(),
        })
    }

    /// Stable identifier used as the decode cache key
    pub fn cache_key(&self) -> String {
        match self {
            ResourceRef::Location(location) => location.clone(),
            ResourceRef::Inline(inline) => format!("inline:{}", inline.id),
        }
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceRef::Location(location) => f.write_str(location),
            ResourceRef::Inline(inline) => {
                write!(f, "inline:{} ({} bytes)", inline.id, inline.bytes.len())
            }
        }
    }
}

fn default_volume() -> f32 {
    1.0
}

/// One audio item placed on the mix timeline (times in seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledAudioItem {
    pub resource: ResourceRef,

    /// Absolute start from the stream origin
    pub start: f64,

    /// Scheduled span; 0.0 means "use the decoded length"
    pub duration: f64,

    /// Volume multiplier 0.0..=1.0
    #[serde(default = "default_volume")]
    pub volume: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fade_in: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fade_out: Option<f64>,

    /// Environment tag (provenance only; set on ambience items)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    /// Tile the source to fill the scheduled span
    #[serde(default)]
    pub looped: bool,
}

impl ScheduledAudioItem {
    /// Full-volume item with no fades
    pub fn new(resource: ResourceRef, start: f64, duration: f64) -> Self {
        Self {
            resource,
            start,
            duration,
            volume: 1.0,
            fade_in: None,
            fade_out: None,
            environment: None,
            looped: false,
        }
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }

    pub fn with_fades(mut self, fade_in: f64, fade_out: f64) -> Self {
        self.fade_in = Some(fade_in);
        self.fade_out = Some(fade_out);
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn looped(mut self, looped: bool) -> Self {
        self.looped = looped;
        self
    }

    /// Scheduled end time
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    pub fn has_environment(&self) -> bool {
        self.environment.as_deref().is_some_and(|e| !e.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_deserializes_from_string() {
        let item: ScheduledAudioItem = serde_json::from_str(
            r#"{"resource":"sounds/rain.mp3","start":1.5,"duration":2.0}"#,
        )
        .unwrap();

        assert_eq!(item.resource, ResourceRef::location("sounds/rain.mp3"));
        assert_eq!(item.volume, 1.0);
        assert!(item.fade_in.is_none());
        assert!(!item.looped);
        assert_eq!(item.end(), 3.5);
    }

    #[test]
    fn test_inline_cache_key_uses_id() {
        let a = ResourceRef::inline(vec![1u8, 2, 3], Some("audio/mpeg"));
        let b = ResourceRef::inline(vec![1u8, 2, 3], Some("audio/mpeg"));

        assert!(a.cache_key().starts_with("inline:"));
        assert_ne!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_volume_is_clamped() {
        let item = ScheduledAudioItem::new(ResourceRef::location("a.wav"), 0.0, 1.0).with_volume(3.0);
        assert_eq!(item.volume, 1.0);
    }

    #[test]
    fn test_empty_environment_is_not_an_environment() {
        let item = ScheduledAudioItem::new(ResourceRef::location("a.wav"), 0.0, 1.0).with_environment("");
        assert!(!item.has_environment());
    }
}

//! Environment → sound resource lookup
//!
//! The queue builder only needs "which sounds belong to this environment
//! tag"; [`SoundLookup`] is that seam. [`EnvironmentTable`] is the
//! configuration-driven implementation.

use narramix_common::config::{EnvironmentProfile, NarramixConfig};
use narramix_common::text::fold_tag;
use narramix_common::ResourceRef;
use tracing::debug;

/// A sound layered periodically (or once) over an environment bed
#[derive(Debug, Clone, PartialEq)]
pub struct LayeredSound {
    pub resource: ResourceRef,
    pub volume: f32,

    /// Repeat period in seconds; `None` plays once
    pub interval_secs: Option<f64>,
}

/// Resolves environment tags to sound resources
pub trait SoundLookup: Send + Sync {
    /// Sound resources for `environment`, bed first; empty when unknown
    fn sounds_for(&self, environment: &str) -> Vec<ResourceRef>;

    /// Periodic / one-shot sounds layered over the environment's bed
    fn layered_for(&self, _environment: &str) -> Vec<LayeredSound> {
        Vec::new()
    }
}

/// Lookup that never finds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSounds;

impl SoundLookup for NoSounds {
    fn sounds_for(&self, _environment: &str) -> Vec<ResourceRef> {
        Vec::new()
    }
}

struct TableEntry {
    /// Folded name and aliases
    keys: Vec<String>,
    sounds: Vec<ResourceRef>,
    layered: Vec<LayeredSound>,
}

/// Sound table built from environment profiles
///
/// Tags and keys are folded (lowercase, accents stripped, whitespace → `_`)
/// and matched by substring in either direction. Profiles are tried in
/// table order and the first matching one wins.
pub struct EnvironmentTable {
    entries: Vec<TableEntry>,
}

impl EnvironmentTable {
    pub fn new(profiles: &[EnvironmentProfile], base_location: &str) -> Self {
        let entries = profiles
            .iter()
            .map(|profile| {
                let keys = std::iter::once(&profile.name)
                    .chain(profile.aliases.iter())
                    .map(|k| fold_tag(k))
                    .filter(|k| !k.is_empty())
                    .collect();

                let resolve = |file: &str| ResourceRef::location(format!("{}{}", base_location, file));

                TableEntry {
                    keys,
                    sounds: profile.sounds.iter().map(|s| resolve(s)).collect(),
                    layered: profile
                        .additional
                        .iter()
                        .map(|extra| LayeredSound {
                            resource: resolve(&extra.sound),
                            volume: extra.volume,
                            interval_secs: extra.interval_secs,
                        })
                        .collect(),
                }
            })
            .collect();

        Self { entries }
    }

    pub fn from_config(config: &NarramixConfig) -> Self {
        Self::new(&config.sounds.environments, &config.sounds.base_location)
    }

    fn find(&self, environment: &str) -> Option<&TableEntry> {
        let tag = fold_tag(environment);
        if tag.is_empty() {
            return None;
        }

        let found = self.entries.iter().find(|entry| {
            entry
                .keys
                .iter()
                .any(|key| tag.contains(key.as_str()) || key.contains(tag.as_str()))
        });

        if found.is_none() {
            debug!(environment = %environment, "No sounds for environment");
        }
        found
    }
}

impl SoundLookup for EnvironmentTable {
    fn sounds_for(&self, environment: &str) -> Vec<ResourceRef> {
        self.find(environment)
            .map(|entry| entry.sounds.clone())
            .unwrap_or_default()
    }

    fn layered_for(&self, environment: &str) -> Vec<LayeredSound> {
        self.find(environment)
            .map(|entry| entry.layered.clone())
            .unwrap_or_default()
    }
}

//! Configuration loading and defaults
//!
//! All settings live in one TOML document. Every field has a built-in default,
//! so an empty file (or no file at all) yields a working configuration.
//!
//! # Resolution order
//!
//! 1. Command-line `--config` path (highest priority)
//! 2. `NARRAMIX_CONFIG` environment variable
//! 3. `<config_dir>/narramix/config.toml`
//! 4. Compiled defaults
//!
//! A missing file at any step is logged and skipped. A file that exists but
//! does not parse or validate is an error.

use crate::fade_curves::FadeCurve;
use crate::segment::{SpeechRate, VolumeCategory};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "NARRAMIX_CONFIG";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarramixConfig {
    /// Working sample rate for decoding and mixing (Hz)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default)]
    pub mixer: MixerSettings,

    #[serde(default)]
    pub queue: QueueSettings,

    /// Values substituted when classification yields nothing
    #[serde(default)]
    pub defaults: SegmentDefaults,

    #[serde(default)]
    pub sounds: SoundSettings,

    #[serde(default = "default_emotions")]
    pub emotions: Vec<EmotionProfile>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Mixer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixerSettings {
    /// Peak ceiling applied by normalization
    #[serde(default = "default_normalize_ceiling")]
    pub normalize_ceiling: f32,

    #[serde(default)]
    pub fade_curve: FadeCurve,

    /// Decode cache bound (0 = unbounded)
    #[serde(default)]
    pub cache_max_entries: usize,
}

/// Queue builder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSettings {
    /// Volume multiplier applied to ambience items
    #[serde(default = "default_ambience_volume")]
    pub ambience_volume: f32,

    /// Ambience fades are the narration fades times this factor
    #[serde(default = "default_ambience_fade_scale")]
    pub ambience_fade_scale: f64,

    /// Schedule the environment's periodic cue sounds as extra items
    #[serde(default)]
    pub include_cues: bool,

    /// Length given to each cue item (seconds)
    #[serde(default = "default_cue_duration")]
    pub cue_duration: f64,
}

/// Fallback tags for segments the classifier could not tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentDefaults {
    /// Empty means no ambience
    #[serde(default)]
    pub environment: String,

    #[serde(default = "default_emotion")]
    pub emotion: String,

    #[serde(default = "default_speech_rate")]
    pub speech_rate: SpeechRate,

    #[serde(default)]
    pub volume: VolumeCategory,
}

/// Sound lookup table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundSettings {
    /// Prefix joined onto every sound file name
    #[serde(default = "default_base_location")]
    pub base_location: String,

    /// Environment profiles, matched in table order
    #[serde(default = "default_environments")]
    pub environments: Vec<EnvironmentProfile>,
}

/// One environment in the sound table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentProfile {
    /// Canonical environment tag
    pub name: String,

    /// Other tags resolving to this environment
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Words in running text that select this environment
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Sound files, first one is the ambience bed
    #[serde(default)]
    pub sounds: Vec<String>,

    /// Periodic or one-shot sounds layered over the bed
    #[serde(default)]
    pub additional: Vec<AdditionalSound>,
}

/// Sound layered over an environment's bed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditionalSound {
    pub sound: String,

    #[serde(default = "default_additional_volume")]
    pub volume: f32,

    /// Repeat period in seconds; `None` plays once at the span start
    #[serde(default)]
    pub interval_secs: Option<f64>,
}

/// Emotion tag and the keywords selecting it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionProfile {
    pub name: String,

    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_sample_rate() -> u32 {
    crate::time::DEFAULT_SAMPLE_RATE
}

fn default_normalize_ceiling() -> f32 {
    0.95
}

fn default_ambience_volume() -> f32 {
    0.4
}

fn default_ambience_fade_scale() -> f64 {
    1.5
}

fn default_cue_duration() -> f64 {
    3.0
}

fn default_emotion() -> String {
    "sensual".to_string()
}

fn default_speech_rate() -> SpeechRate {
    SpeechRate::Slow
}

fn default_base_location() -> String {
    "sounds/environments/".to_string()
}

fn default_additional_volume() -> f32 {
    0.2
}

fn default_log_level() -> String {
    "info".to_string()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn profile(
    name: &str,
    aliases: &[&str],
    keywords: &[&str],
    sounds: &[&str],
    additional: Vec<AdditionalSound>,
) -> EnvironmentProfile {
    EnvironmentProfile {
        name: name.to_string(),
        aliases: strings(aliases),
        keywords: strings(keywords),
        sounds: strings(sounds),
        additional,
    }
}

fn periodic(sound: &str, volume: f32, interval_secs: f64) -> AdditionalSound {
    AdditionalSound {
        sound: sound.to_string(),
        volume,
        interval_secs: Some(interval_secs),
    }
}

/// Built-in environment table
///
/// Order matters: both the classifier and the lookup take the first match.
pub fn default_environments() -> Vec<EnvironmentProfile> {
    vec![
        profile(
            "sea",
            &["mer", "plage", "océan", "vague"],
            &["sea", "ocean", "wave", "beach", "mer", "plage", "vague", "océan"],
            &["ocean-waves-112906.mp3", "sea-wave-34088.mp3", "sea-and-seagull-wave-5932.mp3"],
            vec![periodic("sea-and-seagull-wave-5932.mp3", 0.2, 15.0)],
        ),
        profile(
            "forest",
            &["forêt"],
            &["forest", "woods", "tree", "forêt", "bois", "arbre"],
            &["forest-ambience-296528.mp3", "bird-333090.mp3"],
            vec![periodic("bird-333090.mp3", 0.15, 10.0)],
        ),
        profile(
            "rain",
            &["pluie"],
            &["rain", "pluie"],
            &["light-spring-rain-nature-sounds-331710.mp3"],
            vec![periodic("river-26984.mp3", 0.2, 20.0)],
        ),
        profile(
            "city",
            &["ville"],
            &["city", "street", "ville", "rue"],
            &["city-ambience-9270.mp3"],
            Vec::new(),
        ),
        profile(
            "river",
            &["rivière", "ruisseau"],
            &["river", "stream", "water", "rivière", "ruisseau", "eau"],
            &["river-26984.mp3", "relaxing-mountains-rivers-streams-running-water-18178.mp3"],
            Vec::new(),
        ),
        profile(
            "night",
            &["nuit"],
            &["night", "nuit"],
            &["mid-nights-sound-291477.mp3"],
            vec![periodic("forest-ambience-296528.mp3", 0.1, 15.0)],
        ),
        profile(
            "door",
            &["porte"],
            &["door", "porte"],
            &["main-door-opening-closing-38280.mp3", "opening-the-front-door-210347.mp3"],
            Vec::new(),
        ),
        profile(
            "wind",
            &["vent"],
            &["wind", "vent"],
            &["windy-hut-fx-64675.mp3"],
            Vec::new(),
        ),
        profile(
            "nature",
            &[],
            &["nature"],
            &["calm-nature-sounds-196258.mp3", "bird-333090.mp3"],
            Vec::new(),
        ),
        profile(
            "bird",
            &["oiseau"],
            &["bird", "oiseau"],
            &["bird-333090.mp3"],
            Vec::new(),
        ),
    ]
}

/// Built-in emotion keywords (first match wins)
pub fn default_emotions() -> Vec<EmotionProfile> {
    let emotion = |name: &str, keywords: &[&str]| EmotionProfile {
        name: name.to_string(),
        keywords: strings(keywords),
    };

    vec![
        emotion("excited", &["excit", "soupir", "sigh", "gasp"]),
        emotion("whisper", &["murmure", "chuchot", "whisper", "murmur"]),
        emotion("intense", &["intense", "violent", "fierce"]),
        emotion("tender", &["doux", "tendre", "gentle", "tender"]),
    ]
}

impl Default for MixerSettings {
    fn default() -> Self {
        Self {
            normalize_ceiling: default_normalize_ceiling(),
            fade_curve: FadeCurve::default(),
            cache_max_entries: 0,
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            ambience_volume: default_ambience_volume(),
            ambience_fade_scale: default_ambience_fade_scale(),
            include_cues: false,
            cue_duration: default_cue_duration(),
        }
    }
}

impl Default for SegmentDefaults {
    fn default() -> Self {
        Self {
            environment: String::new(),
            emotion: default_emotion(),
            speech_rate: default_speech_rate(),
            volume: VolumeCategory::Normal,
        }
    }
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self {
            base_location: default_base_location(),
            environments: default_environments(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for NarramixConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            mixer: MixerSettings::default(),
            queue: QueueSettings::default(),
            defaults: SegmentDefaults::default(),
            sounds: SoundSettings::default(),
            emotions: default_emotions(),
            logging: LoggingConfig::default(),
        }
    }
}

impl NarramixConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: NarramixConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Toml(err) => Error::Config(format!("{}: {}", path.display(), err)),
            other => other,
        })
    }

    /// Reject unusable values and clamp volumes into 0.0..=1.0
    pub fn validate(&mut self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::Config("sample_rate must be positive".to_string()));
        }

        let ceiling = self.mixer.normalize_ceiling;
        if !(ceiling > 0.0 && ceiling <= 1.0) {
            return Err(Error::Config(format!(
                "mixer.normalize_ceiling must be in (0, 1], got {}",
                ceiling
            )));
        }

        if self.queue.ambience_fade_scale < 0.0 {
            return Err(Error::Config(format!(
                "queue.ambience_fade_scale must not be negative, got {}",
                self.queue.ambience_fade_scale
            )));
        }

        self.queue.ambience_volume = self.queue.ambience_volume.clamp(0.0, 1.0);
        for env in &mut self.sounds.environments {
            for extra in &mut env.additional {
                extra.volume = extra.volume.clamp(0.0, 1.0);
            }
        }

        Ok(())
    }

    /// Full location of a sound file from the table
    pub fn sound_location(&self, file_name: &str) -> String {
        format!("{}{}", self.sounds.base_location, file_name)
    }
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine(PathBuf),
    Environment(PathBuf),
    UserConfigDir(PathBuf),
    CompiledDefaults,
}

/// Resolves the configuration file following the documented priority order
pub struct ConfigResolver {
    env_var_name: String,
    user_config_path: Option<PathBuf>,
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self {
            env_var_name: CONFIG_ENV_VAR.to_string(),
            user_config_path: default_config_path(),
        }
    }

    /// Override the per-user config path (tests, packaging)
    pub fn with_user_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.user_config_path = path;
        self
    }

    /// Resolve and load the configuration
    pub fn resolve(&self, cli_arg: Option<&Path>) -> Result<(NarramixConfig, ConfigSource)> {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            if path.exists() {
                let config = NarramixConfig::load(path)?;
                info!("Loaded configuration from {}", path.display());
                return Ok((config, ConfigSource::CommandLine(path.to_path_buf())));
            }
            warn!("Config file {} not found, trying next source", path.display());
        }

        // Priority 2: Environment variable
        if let Ok(value) = std::env::var(&self.env_var_name) {
            let path = PathBuf::from(value);
            if path.exists() {
                let config = NarramixConfig::load(&path)?;
                info!("Loaded configuration from {} ({})", path.display(), self.env_var_name);
                return Ok((config, ConfigSource::Environment(path)));
            }
            warn!(
                "{} points to missing file {}, trying next source",
                self.env_var_name,
                path.display()
            );
        }

        // Priority 3: Per-user config directory
        if let Some(path) = &self.user_config_path {
            if path.exists() {
                let config = NarramixConfig::load(path)?;
                info!("Loaded configuration from {}", path.display());
                return Ok((config, ConfigSource::UserConfigDir(path.clone())));
            }
            debug!("No config file at {}", path.display());
        }

        // Priority 4: Compiled defaults
        info!("No configuration file found, using built-in defaults");
        Ok((NarramixConfig::default(), ConfigSource::CompiledDefaults))
    }
}

/// `<config_dir>/narramix/config.toml` for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("narramix").join("config.toml"))
}

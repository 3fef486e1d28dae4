//! Narration synthesis
//!
//! The pipeline hands each segment, with its speech markup, to a
//! [`NarrationSynthesizer`] and gets back a playable resource. Two
//! implementations ship here:
//!
//! - [`FileNarration`]: pre-rendered files, one per segment index
//! - [`HttpNarration`]: a text-to-speech HTTP endpoint taking markup and
//!   returning encoded audio

use crate::error::{Error, Result};
use async_trait::async_trait;
use narramix_common::{ResourceRef, SpeechRate, TextSegment, VolumeCategory};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Produces narration audio for one segment
#[async_trait]
pub trait NarrationSynthesizer: Send + Sync {
    async fn synthesize(&self, index: usize, segment: &TextSegment, markup: &str) -> Result<ResourceRef>;
}

/// Speech markup builder
pub struct SpeechMarkup;

/// Pause after a sentence end, in milliseconds
const BASE_PAUSE_MS: u32 = 1000;

impl SpeechMarkup {
    /// `<speak>` document for `segment`
    ///
    /// Onomatopoeia ("ahhh", "oooh") goes out without prosody or pauses so
    /// the voice renders it as written.
    pub fn for_segment(segment: &TextSegment) -> String {
        let text = escape_xml(&collapse_whitespace(&segment.text));

        if is_onomatopoeia(&segment.text) {
            debug!(text = %segment.text, "Onomatopoeia, sending without prosody");
            return format!("<speak>{}</speak>", text);
        }

        format!(
            "<speak><prosody pitch=\"{}\" rate=\"{}\" volume=\"{}\">{}</prosody></speak>",
            Self::PITCH,
            Self::rate(segment.speech_rate),
            Self::volume(segment.volume),
            with_pauses(&text)
        )
    }

    pub const PITCH: &'static str = "-10%";

    /// Break length after a punctuation mark
    pub fn pause_ms(mark: &str) -> u32 {
        match mark {
            "..." | "\u{2026}" => BASE_PAUSE_MS * 6 / 5,
            "?" => BASE_PAUSE_MS * 11 / 10,
            "!" => BASE_PAUSE_MS * 3 / 2,
            "," => BASE_PAUSE_MS * 7 / 10,
            _ => BASE_PAUSE_MS,
        }
    }

    pub fn rate(rate: SpeechRate) -> &'static str {
        match rate {
            SpeechRate::VerySlow => "25%",
            SpeechRate::Slow => "35%",
            SpeechRate::Moderate => "45%",
            SpeechRate::Fast => "55%",
        }
    }

    pub fn volume(volume: VolumeCategory) -> &'static str {
        match volume {
            VolumeCategory::Soft => "-2dB",
            VolumeCategory::Normal => "+0dB",
            VolumeCategory::Loud => "+4dB",
        }
    }
}

/// A vowel repeated at least three times in a row
pub fn is_onomatopoeia(text: &str) -> bool {
    const VOWELS: &str = "aàâeéèêiïîoôuùû";

    let mut previous = None;
    let mut run = 0;
    for c in text.chars().flat_map(char::to_lowercase) {
        if VOWELS.contains(c) && previous == Some(c) {
            run += 1;
            if run >= 3 {
                return true;
            }
        } else {
            run = if VOWELS.contains(c) { 1 } else { 0 };
        }
        previous = Some(c);
    }
    false
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Insert a `<break>` after each punctuation mark of already-escaped text
///
/// A run of three or more dots counts as one ellipsis.
fn with_pauses(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        out.push(c);
        let mark = match c {
            '.' => {
                let mut dots = 1;
                while chars.next_if_eq(&'.').is_some() {
                    out.push('.');
                    dots += 1;
                }
                if dots >= 3 { "..." } else { "." }
            }
            '\u{2026}' => "...",
            '?' => "?",
            '!' => "!",
            ',' => ",",
            _ => continue,
        };
        out.push_str(&format!("<break time=\"{}ms\"/>", SpeechMarkup::pause_ms(mark)));
    }
    out
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Pre-rendered narration files, indexed by segment position
pub struct FileNarration {
    files: Vec<PathBuf>,
}

/// Extensions picked up by [`FileNarration::from_dir`]
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "ogg", "m4a", "aac"];

impl FileNarration {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { files }
    }

    /// Audio files in `dir`, sorted by file name
    pub async fn from_dir(dir: &Path) -> Result<Self> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_audio = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| AUDIO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
            if is_audio && entry.file_type().await?.is_file() {
                files.push(path);
            }
        }

        files.sort();
        info!(dir = %dir.display(), files = files.len(), "Narration files found");
        Ok(Self { files })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[async_trait]
impl NarrationSynthesizer for FileNarration {
    async fn synthesize(&self, index: usize, _segment: &TextSegment, _markup: &str) -> Result<ResourceRef> {
        self.files
            .get(index)
            .map(|path| ResourceRef::location(path.to_string_lossy()))
            .ok_or_else(|| Error::Synthesis(format!("No narration file for segment {}", index)))
    }
}

/// Per-emotion voice parameters sent with each request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
}

impl VoiceSettings {
    pub fn for_emotion(emotion: &str) -> Self {
        let (stability, similarity_boost) = match narramix_common::text::fold_tag(emotion).as_str() {
            "excited" | "excite" => (0.4, 0.95),
            "whisper" | "murmure" => (0.85, 0.8),
            "intense" => (0.4, 0.95),
            "tender" | "doux" => (0.75, 0.85),
            _ => (0.7, 0.9),
        };
        Self {
            stability,
            similarity_boost,
        }
    }
}

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

const DEFAULT_MODEL_ID: &str = "eleven_multilingual_v2";
const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(60);

/// Text-to-speech over HTTP
///
/// POSTs `{text, model_id, voice_settings}` as JSON and expects encoded audio
/// back. The audio is returned inline, so nothing touches the filesystem.
pub struct HttpNarration {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model_id: String,
}

impl HttpNarration {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(SYNTHESIS_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
            api_key,
            model_id: DEFAULT_MODEL_ID.to_string(),
        })
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }
}

#[async_trait]
impl NarrationSynthesizer for HttpNarration {
    async fn synthesize(&self, index: usize, segment: &TextSegment, markup: &str) -> Result<ResourceRef> {
        let body = SynthesisRequest {
            text: markup,
            model_id: &self.model_id,
            voice_settings: VoiceSettings::for_emotion(&segment.emotion),
        };

        let mut request = self
            .http_client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("xi-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Synthesis(format!("segment {}: {}", index, e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis(format!(
                "segment {}: HTTP {} {}",
                index,
                status.as_u16(),
                detail
            )));
        }

        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| "audio/mpeg".to_string());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Synthesis(format!("segment {}: {}", index, e)))?;

        debug!(segment = index, bytes = bytes.len(), "Narration synthesized");
        Ok(ResourceRef::inline(bytes, Some(mime.as_str())))
    }
}

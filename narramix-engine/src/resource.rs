//! Resource fetching
//!
//! Resolves a [`ResourceRef`] to its encoded bytes. Locations may be
//! `http(s)://` URLs, `file://` URLs or plain filesystem paths; inline
//! resources are returned as-is.

use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use narramix_common::ResourceRef;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// HTTP request timeout for remote sounds
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Encoded audio plus whatever format hint came with it
#[derive(Debug, Clone)]
pub struct FetchedAudio {
    pub bytes: Bytes,
    pub mime: Option<String>,
}

/// Source of encoded audio bytes
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, resource: &ResourceRef) -> Result<FetchedAudio>;
}

/// Fetches from HTTP, the local filesystem, or inline buffers
pub struct DefaultFetcher {
    http_client: reqwest::Client,
}

impl DefaultFetcher {
    pub fn new() -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("narramix/", env!("CARGO_PKG_VERSION")))
            .timeout(HTTP_TIMEOUT)
            .build()?;

        Ok(Self { http_client })
    }

    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    async fn fetch_http(&self, url: &str) -> Result<FetchedAudio> {
        debug!(url = %url, "Fetching remote audio");

        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("{} returned HTTP {}", url, status.as_u16())));
        }

        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;

        Ok(FetchedAudio { bytes, mime })
    }

    async fn fetch_file(path: &Path) -> Result<FetchedAudio> {
        debug!(path = %path.display(), "Reading local audio");

        let data = tokio::fs::read(path)
            .await
            .map_err(|e| Error::Fetch(format!("{}: {}", path.display(), e)))?;

        Ok(FetchedAudio {
            bytes: Bytes::from(data),
            mime: None,
        })
    }
}

#[async_trait]
impl ResourceFetcher for DefaultFetcher {
    async fn fetch(&self, resource: &ResourceRef) -> Result<FetchedAudio> {
        match resource {
            ResourceRef::Inline(inline) => Ok(FetchedAudio {
                bytes: inline.bytes.clone(),
                mime: inline.mime.clone(),
            }),
            ResourceRef::Location(location) => match classify_location(location) {
                Location::Http(url) => self.fetch_http(url).await,
                Location::File(path) => Self::fetch_file(Path::new(path)).await,
                Location::Unsupported(scheme) => Err(Error::Fetch(format!(
                    "Unsupported scheme '{}' in {}",
                    scheme, location
                ))),
            },
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Location<'a> {
    Http(&'a str),
    File(&'a str),
    Unsupported(&'a str),
}

fn classify_location(location: &str) -> Location<'_> {
    if let Some(path) = location.strip_prefix("file://") {
        return Location::File(path);
    }

    match location.split_once("://") {
        Some((scheme, _)) if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https") => {
            Location::Http(location)
        }
        Some((scheme, _)) => Location::Unsupported(scheme),
        None => Location::File(location),
    }
}

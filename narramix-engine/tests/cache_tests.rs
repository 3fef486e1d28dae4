//! Decode cache behaviour seen through the mixer

mod helpers;

use helpers::{tone_wav, MemoryFetcher};
use narramix_common::{ResourceRef, ScheduledAudioItem};
use narramix_engine::cache::{DecodeCache, EvictionPolicy};
use narramix_engine::mixer::{AudioMixer, MixOutcome, MixerConfig};
use std::sync::Arc;
use std::time::Duration;

const RATE: u32 = 8000;

fn config(eviction: EvictionPolicy) -> MixerConfig {
    MixerConfig {
        sample_rate: RATE,
        eviction,
        ..MixerConfig::default()
    }
}

fn item(location: &str, start: f64) -> ScheduledAudioItem {
    ScheduledAudioItem::new(ResourceRef::location(location), start, 0.25)
}

#[tokio::test]
async fn test_duplicate_resource_decoded_once_per_mix() {
    let fetcher = Arc::new(MemoryFetcher::new().with_delay(Duration::from_millis(20)));
    fetcher.insert("bed.wav", tone_wav(0.25, RATE, 0.2));

    let mixer = AudioMixer::new(config(EvictionPolicy::Unbounded), fetcher.clone());
    let result = mixer
        .mix(&[item("bed.wav", 0.0), item("bed.wav", 0.1), item("bed.wav", 0.2)])
        .await
        .unwrap();

    assert_eq!(result.segments.len(), 3);
    assert_eq!(fetcher.fetch_count(), 1);
    assert_eq!(mixer.cache().decode_count(), 1);
}

#[tokio::test]
async fn test_concurrent_mixers_share_one_decode() {
    let fetcher = Arc::new(MemoryFetcher::new().with_delay(Duration::from_millis(20)));
    fetcher.insert("bed.wav", tone_wav(0.25, RATE, 0.2));
    fetcher.insert("voice.wav", tone_wav(0.25, RATE, 0.2));

    let cache = Arc::new(DecodeCache::new(EvictionPolicy::Unbounded));
    let a = AudioMixer::new(config(EvictionPolicy::Unbounded), fetcher.clone()).with_cache(cache.clone());
    let b = AudioMixer::new(config(EvictionPolicy::Unbounded), fetcher.clone()).with_cache(cache.clone());

    let items = [item("voice.wav", 0.0), item("bed.wav", 0.0)];
    let (ra, rb) = tokio::join!(a.mix(&items), b.mix(&items));

    assert_eq!(ra.unwrap().outcome, MixOutcome::Mixed);
    assert_eq!(rb.unwrap().outcome, MixOutcome::Mixed);
    assert_eq!(cache.decode_count(), 2);
    assert_eq!(fetcher.fetch_count(), 2);
    assert_eq!(cache.len().await, 2);
}

#[tokio::test]
async fn test_failed_decode_is_retried_later() {
    let fetcher = Arc::new(MemoryFetcher::new());
    fetcher.insert("voice.wav", tone_wav(0.25, RATE, 0.2));

    let mixer = AudioMixer::new(config(EvictionPolicy::Unbounded), fetcher.clone());
    let items = [item("voice.wav", 0.0), item("late.wav", 0.1)];

    let first = mixer.mix(&items).await.unwrap();
    assert_eq!(first.segments.len(), 1);
    assert!(mixer.cache().get("late.wav").await.is_none());

    fetcher.insert("late.wav", tone_wav(0.25, RATE, 0.2));
    let second = mixer.mix(&items).await.unwrap();
    assert_eq!(second.segments.len(), 2);

    // voice.wav came from the cache the second time
    assert_eq!(fetcher.fetch_count(), 3);
}

#[tokio::test]
async fn test_max_entries_bounds_the_cache() {
    let fetcher = Arc::new(MemoryFetcher::new());
    for name in ["a.wav", "b.wav", "c.wav"] {
        fetcher.insert(name, tone_wav(0.1, RATE, 0.2));
    }

    let mixer = AudioMixer::new(config(EvictionPolicy::MaxEntries(2)), fetcher);
    mixer
        .mix(&[item("a.wav", 0.0), item("b.wav", 0.0), item("c.wav", 0.0)])
        .await
        .unwrap();

    assert_eq!(mixer.cache().len().await, 2);
}

//! Voice registry: speaker → cloned-voice handle mapping over a mock or
//! real backend.
//!
//! The backend is picked once at construction and never changes for the
//! registry's lifetime. Registration always overwrites the stored handle
//! for a speaker; synthesis never mutates the mapping.

use std::collections::HashMap;
#[cfg(test)]
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::VoiceServiceConfig;
use crate::error::VoiceError;
use crate::wav::{encode_wav, fallback_tone};

/// Opaque identifier issued by a cloning backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceHandle(String);

impl VoiceHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VoiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Playable result of a synthesis request
#[derive(Debug, Clone)]
pub enum AudioResource {
    /// Real audio bytes returned by the synthesis endpoint
    Remote { bytes: Vec<u8> },
    /// Sentinel from the mock backend: no real audio exists, play a
    /// locally generated tone instead
    FallbackTone,
}

impl AudioResource {
    /// Realize playable WAV bytes for this resource.
    pub fn into_playable_bytes(self) -> Vec<u8> {
        match self {
            AudioResource::Remote { bytes } => bytes,
            // Mono tone, so encoding cannot hit the channel-count error.
            AudioResource::FallbackTone => {
                encode_wav(&fallback_tone(0.75, 16000)).unwrap_or_default()
            }
        }
    }
}

/// Simulated backend: fixed delays, deterministic-looking placeholder
/// handles, no network access.
#[derive(Debug, Clone)]
pub struct MockVoiceService {
    delay: Duration,
    #[cfg(test)]
    fail_speakers: HashSet<String>,
}

impl MockVoiceService {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            #[cfg(test)]
            fail_speakers: HashSet::new(),
        }
    }

    /// Script registration failures for specific speakers.
    #[cfg(test)]
    pub(crate) fn failing_for<I: IntoIterator<Item = String>>(delay: Duration, speakers: I) -> Self {
        Self {
            delay,
            fail_speakers: speakers.into_iter().collect(),
        }
    }

    async fn register(&self, speaker_id: &str, audio_wav: &[u8]) -> Result<VoiceHandle, VoiceError> {
        tokio::time::sleep(self.delay).await;

        #[cfg(test)]
        if self.fail_speakers.contains(speaker_id) {
            return Err(VoiceError::Registration(format!(
                "scripted failure for speaker '{speaker_id}'"
            )));
        }

        Ok(placeholder_handle(speaker_id, audio_wav))
    }

    async fn synthesize(&self) -> AudioResource {
        tokio::time::sleep(self.delay).await;
        AudioResource::FallbackTone
    }
}

/// Real backend talking to the remote cloning/synthesis endpoints
#[derive(Debug, Clone)]
pub struct RemoteVoiceService {
    client: reqwest::Client,
    api_key: String,
    clone_endpoint: String,
    tts_endpoint: String,
}

#[derive(Debug, Deserialize)]
struct CloneResponse {
    voice_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    voice_id: &'a str,
}

impl RemoteVoiceService {
    pub fn new(api_key: String, config: &VoiceServiceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            clone_endpoint: config.clone_endpoint.clone(),
            tts_endpoint: config.tts_endpoint.clone(),
        })
    }

    async fn register(&self, speaker_id: &str, audio_wav: Vec<u8>) -> Result<VoiceHandle, VoiceError> {
        let part = reqwest::multipart::Part::bytes(audio_wav)
            .file_name(format!("{speaker_id}.wav"))
            .mime_str("audio/wav")
            .map_err(|e| VoiceError::Registration(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("name", speaker_id.to_string())
            .part("audio", part);

        debug!("Uploading voice sample for '{}' to {}", speaker_id, self.clone_endpoint);

        let response = self
            .client
            .post(&self.clone_endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| VoiceError::Registration(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(VoiceError::Registration(format!(
                "clone endpoint returned {status}: {text}"
            )));
        }

        let body: CloneResponse = response
            .json()
            .await
            .map_err(|e| VoiceError::Registration(e.to_string()))?;

        match body.voice_id {
            Some(id) => Ok(VoiceHandle::new(id)),
            None => Err(VoiceError::Registration(
                "clone endpoint response carried no voice id".to_string(),
            )),
        }
    }

    async fn synthesize(&self, text: &str, handle: &VoiceHandle) -> Result<AudioResource, VoiceError> {
        let request = SynthesisRequest {
            text,
            voice_id: handle.as_str(),
        };

        let response = self
            .client
            .post(&self.tts_endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| VoiceError::Synthesis(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(VoiceError::Synthesis(format!(
                "synthesis endpoint returned {status}: {text}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| VoiceError::Synthesis(e.to_string()))?;

        Ok(AudioResource::Remote {
            bytes: bytes.to_vec(),
        })
    }
}

/// Backend selection, resolved once at startup
#[derive(Debug, Clone)]
pub enum VoiceBackend {
    Mock(MockVoiceService),
    Real(RemoteVoiceService),
}

/// Process-scoped speaker → voice handle store over one backend.
///
/// Owned and injectable rather than global, so tests and concurrent
/// sessions each get their own instance.
#[derive(Debug)]
pub struct VoiceRegistry {
    backend: VoiceBackend,
    handles: RwLock<HashMap<String, VoiceHandle>>,
}

impl VoiceRegistry {
    pub fn new(backend: VoiceBackend) -> Self {
        Self {
            backend,
            handles: RwLock::new(HashMap::new()),
        }
    }

    /// Build a registry from config: a present, non-placeholder API key
    /// selects the real backend, anything else the mock.
    pub fn from_config(config: &VoiceServiceConfig) -> Result<Self> {
        let backend = match config.resolved_api_key() {
            Some(key) => {
                info!("🎙️  Voice service: real backend at {}", config.clone_endpoint);
                VoiceBackend::Real(RemoteVoiceService::new(key, config)?)
            }
            None => {
                info!("🎭 Voice service: mock backend (no API key configured)");
                VoiceBackend::Mock(MockVoiceService::new(Duration::from_millis(
                    config.mock_delay_ms,
                )))
            }
        };
        Ok(Self::new(backend))
    }

    pub fn is_mock(&self) -> bool {
        matches!(self.backend, VoiceBackend::Mock(_))
    }

    /// Upload a voice sample and store the issued handle for the
    /// speaker, replacing any previous one.
    pub async fn register(&self, speaker_id: &str, audio_wav: Vec<u8>) -> Result<VoiceHandle, VoiceError> {
        let handle = match &self.backend {
            VoiceBackend::Mock(mock) => mock.register(speaker_id, &audio_wav).await?,
            VoiceBackend::Real(remote) => remote.register(speaker_id, audio_wav).await?,
        };

        debug!("Registered voice '{}' for speaker '{}'", handle, speaker_id);
        self.handles
            .write()
            .await
            .insert(speaker_id.to_string(), handle.clone());
        Ok(handle)
    }

    /// Store a placeholder handle without uploading anything. Demo runs
    /// use this so the UI can be exercised without real media.
    pub async fn register_placeholder(&self, speaker_id: &str) -> VoiceHandle {
        let handle = placeholder_handle(speaker_id, speaker_id.as_bytes());
        self.handles
            .write()
            .await
            .insert(speaker_id.to_string(), handle.clone());
        handle
    }

    /// Synthesize speech in a speaker's registered voice.
    pub async fn synthesize(&self, speaker_id: &str, text: &str) -> Result<AudioResource, VoiceError> {
        let handle = self
            .handle_for(speaker_id)
            .await
            .ok_or_else(|| VoiceError::UnknownSpeaker(speaker_id.to_string()))?;

        match &self.backend {
            VoiceBackend::Mock(mock) => Ok(mock.synthesize().await),
            VoiceBackend::Real(remote) => remote.synthesize(text, &handle).await,
        }
    }

    /// Current handle for a speaker, if one is registered
    pub async fn handle_for(&self, speaker_id: &str) -> Option<VoiceHandle> {
        self.handles.read().await.get(speaker_id).cloned()
    }
}

/// Deterministic-looking placeholder handle for mock and demo
/// registrations, derived from the speaker id and sample bytes.
fn placeholder_handle(speaker_id: &str, audio_wav: &[u8]) -> VoiceHandle {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    speaker_id.hash(&mut hasher);
    audio_wav.hash(&mut hasher);
    VoiceHandle::new(format!("mock-voice-{speaker_id}-{:08x}", hasher.finish() as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_registry() -> VoiceRegistry {
        VoiceRegistry::new(VoiceBackend::Mock(MockVoiceService::new(
            Duration::from_millis(1),
        )))
    }

    #[tokio::test]
    async fn test_register_stores_handle() {
        let registry = mock_registry();

        let handle = registry.register("alice", vec![1, 2, 3]).await.unwrap();
        assert!(handle.as_str().starts_with("mock-voice-alice-"));
        assert_eq!(registry.handle_for("alice").await, Some(handle));
    }

    #[tokio::test]
    async fn test_reregister_overwrites_and_newer_handle_wins() {
        let registry = mock_registry();

        let first = registry.register("alice", vec![1, 2, 3]).await.unwrap();
        let second = registry.register("alice", vec![4, 5, 6]).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(registry.handle_for("alice").await, Some(second));
    }

    #[tokio::test]
    async fn test_synthesize_unknown_speaker_fails() {
        let registry = mock_registry();

        let err = registry.synthesize("nobody", "hello").await.unwrap_err();
        assert!(matches!(err, VoiceError::UnknownSpeaker(_)));
    }

    #[tokio::test]
    async fn test_mock_synthesize_returns_fallback_sentinel() {
        let registry = mock_registry();
        registry.register("alice", vec![1]).await.unwrap();

        let resource = registry.synthesize("alice", "hello").await.unwrap();
        assert!(matches!(resource, AudioResource::FallbackTone));
    }

    #[tokio::test]
    async fn test_scripted_mock_failure() {
        let registry = VoiceRegistry::new(VoiceBackend::Mock(MockVoiceService::failing_for(
            Duration::from_millis(1),
            ["alice".to_string()],
        )));

        let err = registry.register("alice", vec![1]).await.unwrap_err();
        assert!(matches!(err, VoiceError::Registration(_)));
        assert_eq!(registry.handle_for("alice").await, None);
    }

    #[test]
    fn test_placeholder_handle_is_deterministic() {
        let a = placeholder_handle("alice", b"sample");
        let b = placeholder_handle("alice", b"sample");
        let c = placeholder_handle("alice", b"other");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_fallback_resource_renders_playable_bytes() {
        let bytes = AudioResource::FallbackTone.into_playable_bytes();
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
    }
}

//! Revoice - Voice Cloning Pipeline
//!
//! Extracts a representative audio clip per detected speaker, serializes
//! it to 16-bit PCM WAV, registers a cloned voice with a remote service
//! (or a mock), and serves text-to-speech requests in that voice.

pub mod analysis;
pub mod config;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod registry;
pub mod wav;

// Re-export main types for easy access
pub use crate::analysis::{AnalysisResult, Segment, Speaker, VideoAnalyzer, VideoMetadata};
pub use crate::config::{Config, ConfigBuilder, VoiceServiceConfig};
pub use crate::error::{EncodeError, ExtractError, VoiceError};
pub use crate::extract::{ClipExtractor, SampleBuffer};
pub use crate::orchestrator::{CloningOrchestrator, CloningStatus, PipelineSnapshot, RunState};
pub use crate::registry::{AudioResource, VoiceBackend, VoiceHandle, VoiceRegistry};
pub use crate::wav::{encode_wav, fallback_tone};

//! Cloning orchestration: one representative clip per speaker, driven
//! through extract → encode → register, with per-speaker status tracked
//! reactively.
//!
//! Speakers are processed strictly sequentially in analysis order: each
//! extraction decodes the full media source, so fanning out would
//! multiply peak memory by the speaker count. One speaker's failure
//! never blocks the rest of the queue, and a run always reaches `Ready`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::analysis::AnalysisResult;
use crate::error::VoiceError;
use crate::extract::ClipExtractor;
use crate::registry::{AudioResource, VoiceRegistry};
use crate::wav::encode_wav;

/// Lifecycle of one orchestration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Idle,
    Preparing,
    Running,
    Ready,
}

/// Per-speaker cloning outcome.
///
/// Every tracked speaker starts `Pending` and transitions exactly once,
/// to `Cloned` or `Failed`, within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CloningStatus {
    Pending,
    Cloned,
    Failed,
}

impl std::fmt::Display for CloningStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloningStatus::Pending => f.write_str("pending"),
            CloningStatus::Cloned => f.write_str("cloned"),
            CloningStatus::Failed => f.write_str("failed"),
        }
    }
}

/// Reactive view of the active run, published on every transition
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSnapshot {
    pub state: RunState,
    pub is_ready: bool,
    pub progress: String,
    pub speaker_status: HashMap<String, CloningStatus>,
}

impl Default for PipelineSnapshot {
    fn default() -> Self {
        Self {
            state: RunState::Idle,
            is_ready: false,
            progress: "Waiting for analysis".to_string(),
            speaker_status: HashMap::new(),
        }
    }
}

/// Drives per-speaker voice cloning and serves synthesis requests
pub struct CloningOrchestrator {
    registry: Arc<VoiceRegistry>,
    extractor: ClipExtractor,
    snapshot_tx: watch::Sender<PipelineSnapshot>,
    /// Monotonic run counter; writes from superseded runs are dropped
    generation: AtomicU64,
}

impl CloningOrchestrator {
    pub fn new(registry: Arc<VoiceRegistry>) -> Self {
        let (snapshot_tx, _) = watch::channel(PipelineSnapshot::default());
        Self {
            registry,
            extractor: ClipExtractor::new(),
            snapshot_tx,
            generation: AtomicU64::new(0),
        }
    }

    /// Subscribe to snapshot updates
    pub fn subscribe(&self) -> watch::Receiver<PipelineSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Current snapshot
    pub fn snapshot(&self) -> PipelineSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn registry(&self) -> &Arc<VoiceRegistry> {
        &self.registry
    }

    /// Run voice cloning for every speaker in the analysis result.
    ///
    /// With a media source, one clip per speaker is extracted, encoded,
    /// and registered, sequentially in speaker-list order. Without one
    /// (demo mode), every speaker gets a placeholder voice immediately.
    /// A newly started run supersedes any in-flight one: the old run's
    /// remaining writes are dropped, though its in-flight step is not
    /// interrupted.
    pub async fn run(&self, analysis: &AnalysisResult, media: Option<Vec<u8>>) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        match media {
            Some(media) => self.run_cloning(analysis, Arc::new(media), generation).await,
            None => self.run_demo(analysis, generation).await,
        }
    }

    /// Demo path: no media source, placeholder voices for everyone so
    /// the UI can be exercised end-to-end without a real upload.
    async fn run_demo(&self, analysis: &AnalysisResult, generation: u64) {
        info!("🎭 Demo run: registering placeholder voices for {} speaker(s)", analysis.speakers.len());

        self.publish_if_current(generation, |snapshot| {
            snapshot.state = RunState::Preparing;
            snapshot.is_ready = false;
            snapshot.speaker_status.clear();
            for speaker in &analysis.speakers {
                snapshot
                    .speaker_status
                    .insert(speaker.id.clone(), CloningStatus::Pending);
            }
            snapshot.progress = format!(
                "Preparing to clone {} voice(s)",
                analysis.speakers.len()
            );
        });

        for speaker in &analysis.speakers {
            let handle = self.registry.register_placeholder(&speaker.id).await;
            info!("✅ Placeholder voice {} for '{}'", handle, speaker.display_name);
            self.publish_if_current(generation, |snapshot| {
                snapshot
                    .speaker_status
                    .insert(speaker.id.clone(), CloningStatus::Cloned);
            });
        }

        self.publish_if_current(generation, |snapshot| {
            snapshot.state = RunState::Ready;
            snapshot.is_ready = true;
            snapshot.progress = "Demo voices ready".to_string();
        });
    }

    /// Real path: extract → encode → register per speaker, one at a
    /// time, tolerating per-speaker failure.
    async fn run_cloning(&self, analysis: &AnalysisResult, media: Arc<Vec<u8>>, generation: u64) {
        // One representative segment per speaker; speakers with no
        // segments are skipped and get no status entry at all.
        let queue: Vec<_> = analysis
            .speakers
            .iter()
            .filter_map(|speaker| {
                analysis
                    .longest_segment_for(&speaker.id)
                    .map(|segment| (speaker, segment))
            })
            .collect();

        let skipped = analysis.speakers.len() - queue.len();
        info!(
            "🎬 Cloning {} voice(s) ({} speaker(s) without segments skipped)",
            queue.len(),
            skipped
        );

        // Preparing resets every queued speaker to Pending; skipped
        // speakers get no entry at all.
        self.publish_if_current(generation, |snapshot| {
            snapshot.state = RunState::Preparing;
            snapshot.is_ready = false;
            snapshot.speaker_status.clear();
            for (speaker, _) in &queue {
                snapshot
                    .speaker_status
                    .insert(speaker.id.clone(), CloningStatus::Pending);
            }
            snapshot.progress = format!("Preparing to clone {} voice(s)", queue.len());
        });

        self.publish_if_current(generation, |snapshot| {
            snapshot.state = RunState::Running;
        });

        let total = queue.len();
        let mut cloned = 0usize;
        let mut failed = 0usize;

        for (index, (speaker, segment)) in queue.into_iter().enumerate() {
            self.publish_if_current(generation, |snapshot| {
                snapshot.progress = format!(
                    "Cloning voice {}/{}: {}",
                    index + 1,
                    total,
                    speaker.display_name
                );
            });

            let status = match self.clone_one(&speaker.id, segment.start_time, segment.end_time, &media).await {
                Ok(handle) => {
                    info!(
                        "✅ Cloned voice for '{}' ({:.1}s sample) -> {}",
                        speaker.display_name,
                        segment.duration().as_secs_f64(),
                        handle
                    );
                    cloned += 1;
                    CloningStatus::Cloned
                }
                Err(e) => {
                    warn!("❌ Cloning failed for '{}': {}", speaker.display_name, e);
                    failed += 1;
                    CloningStatus::Failed
                }
            };

            self.publish_if_current(generation, |snapshot| {
                snapshot.speaker_status.insert(speaker.id.clone(), status);
            });
        }

        self.publish_if_current(generation, |snapshot| {
            snapshot.state = RunState::Ready;
            snapshot.is_ready = true;
            snapshot.progress = format!(
                "Voice cloning complete: {cloned} cloned, {failed} failed"
            );
        });

        info!("🎉 Cloning run finished: {} cloned, {} failed, {} skipped", cloned, failed, skipped);
    }

    /// Extract, encode, and register one speaker's sample.
    async fn clone_one(
        &self,
        speaker_id: &str,
        start_time: f64,
        end_time: f64,
        media: &Arc<Vec<u8>>,
    ) -> Result<crate::registry::VoiceHandle, VoiceError> {
        let extractor = self.extractor.clone();
        let media = Arc::clone(media);

        // The full-stream decode is CPU-bound; keep it off the reactor.
        let clip = tokio::task::spawn_blocking(move || {
            extractor.extract(&media, start_time, end_time)
        })
        .await
        .map_err(|e| {
            VoiceError::Extraction(crate::error::ExtractError::Decode(format!(
                "extraction task aborted: {e}"
            )))
        })??;

        debug!(
            "Clip for '{}': {:.2}s at {}Hz",
            speaker_id,
            clip.duration_secs(),
            clip.sample_rate()
        );

        let wav = encode_wav(&clip)?;
        self.registry.register(speaker_id, wav).await
    }

    /// Synthesize speech for one segment of edited text.
    ///
    /// Mock mode accepts requests at any time; real mode requires the
    /// speaker's voice to have finished cloning.
    pub async fn synthesize_segment(
        &self,
        speaker_id: &str,
        text: &str,
    ) -> Result<AudioResource, VoiceError> {
        if !self.registry.is_mock() {
            let status = self.snapshot_tx.borrow().speaker_status.get(speaker_id).copied();
            if status != Some(CloningStatus::Cloned) {
                return Err(VoiceError::VoiceUnavailable {
                    speaker_id: speaker_id.to_string(),
                    status: status
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "not tracked".to_string()),
                });
            }
        }

        self.registry.synthesize(speaker_id, text).await
    }

    /// Apply a snapshot mutation unless the run that produced it has
    /// been superseded.
    fn publish_if_current(
        &self,
        generation: u64,
        mutate: impl FnOnce(&mut PipelineSnapshot),
    ) -> bool {
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        self.snapshot_tx.send_modify(mutate);
        true
    }
}

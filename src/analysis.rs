//! Analysis result data model and the external analyzer boundary.
//!
//! The video-analysis service itself is an external collaborator; this
//! module owns the types it produces and the sample-selection rule the
//! cloning pipeline applies to them.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// A speaker detected by video analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Speaker {
    /// Unique, session-stable speaker id
    pub id: String,
    /// Display name shown in the editing UI
    pub display_name: String,
    /// Free-text description of the voice (gender, tone, accent)
    pub voice_descriptor: String,
}

/// A contiguous interval of speech attributed to one speaker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Unique segment id
    pub id: String,
    /// Owning speaker id
    pub speaker_id: String,
    /// Start time in seconds
    pub start_time: f64,
    /// End time in seconds (>= start_time)
    pub end_time: f64,
    /// Transcript text
    pub text: String,
}

impl Segment {
    /// Duration of this segment
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64((self.end_time - self.start_time).max(0.0))
    }
}

/// Video-level metadata from analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Total media duration in seconds
    pub total_duration: f64,
    /// Detected primary language (BCP-47 style tag)
    pub detected_language: String,
}

/// Complete analysis result: metadata plus speakers and their segments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub metadata: VideoMetadata,
    pub speakers: Vec<Speaker>,
    pub segments: Vec<Segment>,
}

impl AnalysisResult {
    /// Select the cloning sample for a speaker: the longest-duration
    /// segment they own, first-encountered winning ties. Longer samples
    /// give the cloning service more signal to work with.
    pub fn longest_segment_for(&self, speaker_id: &str) -> Option<&Segment> {
        let mut best: Option<&Segment> = None;
        for segment in self.segments.iter().filter(|s| s.speaker_id == speaker_id) {
            match best {
                Some(current) if segment.duration() <= current.duration() => {}
                _ => best = Some(segment),
            }
        }
        best
    }

    /// All segments owned by a speaker, in analysis order
    pub fn segments_for(&self, speaker_id: &str) -> Vec<&Segment> {
        self.segments
            .iter()
            .filter(|s| s.speaker_id == speaker_id)
            .collect()
    }

    /// Load an analysis result from a JSON file
    pub async fn from_json_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let result = serde_json::from_str(&content)?;
        Ok(result)
    }
}

/// Boundary contract for the external video-analysis service
#[async_trait]
pub trait VideoAnalyzer: Send + Sync {
    /// Analyze raw video bytes into speakers and transcript segments
    async fn analyze(&self, video_bytes: &[u8]) -> Result<AnalysisResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(id: &str, speaker_id: &str, start: f64, end: f64) -> Segment {
        Segment {
            id: id.to_string(),
            speaker_id: speaker_id.to_string(),
            start_time: start,
            end_time: end,
            text: String::new(),
        }
    }

    fn analysis(segments: Vec<Segment>) -> AnalysisResult {
        AnalysisResult {
            metadata: VideoMetadata {
                total_duration: 60.0,
                detected_language: "en".to_string(),
            },
            speakers: Vec::new(),
            segments,
        }
    }

    #[test]
    fn test_longest_segment_selection() {
        let result = analysis(vec![
            segment("s1", "alice", 0.0, 1.0),
            segment("s2", "alice", 5.0, 8.0),
            segment("s3", "bob", 10.0, 12.0),
        ]);

        let picked = result.longest_segment_for("alice").unwrap();
        assert_eq!(picked.id, "s2");
    }

    #[test]
    fn test_longest_segment_tie_break_first_wins() {
        let result = analysis(vec![
            segment("s1", "alice", 0.0, 2.0),
            segment("s2", "alice", 5.0, 7.0),
        ]);

        let picked = result.longest_segment_for("alice").unwrap();
        assert_eq!(picked.id, "s1");
    }

    #[test]
    fn test_segments_for_filters_by_owner_in_order() {
        let result = analysis(vec![
            segment("s1", "alice", 0.0, 1.0),
            segment("s2", "bob", 1.0, 2.0),
            segment("s3", "alice", 2.0, 3.0),
        ]);

        let alices: Vec<&str> = result
            .segments_for("alice")
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(alices, vec!["s1", "s3"]);
        assert!(result.segments_for("carol").is_empty());
    }

    #[test]
    fn test_no_segments_for_speaker() {
        let result = analysis(vec![segment("s1", "alice", 0.0, 1.0)]);
        assert!(result.longest_segment_for("bob").is_none());
    }

    #[test]
    fn test_segment_duration_clamps_negative() {
        let s = segment("s1", "alice", 5.0, 5.0);
        assert_eq!(s.duration(), Duration::from_secs(0));
    }
}

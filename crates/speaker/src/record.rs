//! Per-session speaker records

use serde::{Deserialize, Serialize};

use crate::features::VoiceFeatures;

/// Accumulated voice-feature profile for one speaker within a session
///
/// Created when a new voice is first detected; lives until session end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerRecord {
    /// Stable id within the session, e.g. "Speaker_1"
    pub speaker_id: String,
    /// Running average of observed features
    pub features: VoiceFeatures,
    /// How many samples have been folded into the average
    pub sample_count: u32,
    /// Transcripts attributed to this speaker, in order
    pub transcripts: Vec<String>,
}

impl SpeakerRecord {
    /// Create a record from the first observed sample
    pub fn new(speaker_id: impl Into<String>, features: VoiceFeatures, transcript: &str) -> Self {
        let mut transcripts = Vec::new();
        if !transcript.trim().is_empty() {
            transcripts.push(transcript.to_string());
        }
        Self {
            speaker_id: speaker_id.into(),
            features,
            sample_count: 1,
            transcripts,
        }
    }

    /// Fold a new observation into the running average
    pub fn observe(&mut self, features: &VoiceFeatures, transcript: &str) {
        self.features.fold(features, self.sample_count);
        self.sample_count += 1;
        if !transcript.trim().is_empty() {
            self.transcripts.push(transcript.to_string());
        }
    }

    /// Similarity between this record's profile and a new sample
    ///
    /// Average of four normalized sub-scores: volume, pitch, rate, and
    /// fingerprint exact match. Returns 0.0 - 1.0.
    pub fn similarity(&self, sample: &VoiceFeatures) -> f32 {
        let volume = ratio_score(self.features.volume, sample.volume);
        let pitch = ratio_score(self.features.pitch, sample.pitch);
        let rate = ratio_score(self.features.rate, sample.rate);
        let fingerprint = if self.features.fingerprint == sample.fingerprint {
            1.0
        } else {
            0.0
        };

        (volume + pitch + rate + fingerprint) / 4.0
    }
}

/// Closeness of two non-negative magnitudes as 1 - relative difference
fn ratio_score(a: f32, b: f32) -> f32 {
    let max = a.max(b);
    if max <= f32::EPSILON {
        // Both effectively zero: identical
        return 1.0;
    }
    (1.0 - (a - b).abs() / max).clamp(0.0, 1.0)
}

//! Voice feature extraction
//!
//! Features are cheap approximations: mean amplitude for volume, zero
//! crossing rate for pitch, transcript words over audio duration for
//! speaking rate, and a coarse quantization of the three as a fingerprint
//! token. Good enough to separate voices in a session, not biometrics.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::SpeakerError;

/// Lightweight per-utterance voice feature vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceFeatures {
    /// Average absolute amplitude, normalized to 0.0 - 1.0
    pub volume: f32,
    /// Pitch estimate in Hz (zero-crossing based)
    pub pitch: f32,
    /// Speaking rate estimate in words per second
    pub rate: f32,
    /// Coarse fingerprint token over the quantized features
    pub fingerprint: u64,
}

impl VoiceFeatures {
    /// Fold another sample into this running average
    ///
    /// `count` is the number of samples already folded in (>= 1). The
    /// fingerprint tracks the most recent token; tokens do not average.
    pub fn fold(&mut self, sample: &VoiceFeatures, count: u32) {
        let n = count as f32 + 1.0;
        self.volume += (sample.volume - self.volume) / n;
        self.pitch += (sample.pitch - self.pitch) / n;
        self.rate += (sample.rate - self.rate) / n;
        self.fingerprint = sample.fingerprint;
    }
}

/// Narrow seam for acoustic feature extraction
///
/// The shipped implementation is heuristic; production speaker recognition
/// replaces this trait implementation without touching turn coordination or
/// session management.
pub trait FeatureExtractor: Send + Sync + 'static {
    /// Extract features from a complete utterance
    ///
    /// # Arguments
    /// * `audio` - PCM16 little-endian bytes
    /// * `transcript` - Transcript of the utterance (may be empty, e.g.
    ///   during enrollment)
    fn extract(&self, audio: &[u8], transcript: &str) -> Result<VoiceFeatures, SpeakerError>;

    /// Get extractor name for logging
    fn name(&self) -> &str;
}

/// Heuristic extractor over raw PCM16 audio
#[derive(Debug, Clone)]
pub struct HeuristicFeatureExtractor {
    sample_rate: u32,
}

impl HeuristicFeatureExtractor {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    /// Decode PCM16 little-endian bytes into samples, dropping a trailing
    /// odd byte
    fn decode(audio: &[u8]) -> Vec<i16> {
        audio
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect()
    }
}

impl FeatureExtractor for HeuristicFeatureExtractor {
    fn extract(&self, audio: &[u8], transcript: &str) -> Result<VoiceFeatures, SpeakerError> {
        if audio.is_empty() {
            return Err(SpeakerError::InvalidInput("no audio data".to_string()));
        }

        let samples = Self::decode(audio);
        if samples.is_empty() {
            return Err(SpeakerError::InvalidInput(
                "audio shorter than one sample".to_string(),
            ));
        }

        let volume = samples
            .iter()
            .map(|s| (*s as f32).abs() / i16::MAX as f32)
            .sum::<f32>()
            / samples.len() as f32;

        // Zero crossings per second, halved: a crude fundamental estimate
        let crossings = samples
            .windows(2)
            .filter(|w| (w[0] >= 0) != (w[1] >= 0))
            .count();
        let duration_secs = samples.len() as f32 / self.sample_rate as f32;
        let pitch = if duration_secs > 0.0 {
            crossings as f32 / duration_secs / 2.0
        } else {
            0.0
        };

        let words = transcript.split_whitespace().count();
        let rate = if duration_secs > 0.0 {
            words as f32 / duration_secs
        } else {
            0.0
        };

        let fingerprint = fingerprint_token(volume, pitch, rate);

        Ok(VoiceFeatures {
            volume,
            pitch,
            rate,
            fingerprint,
        })
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

/// Hash coarse feature buckets into a fingerprint token
fn fingerprint_token(volume: f32, pitch: f32, rate: f32) -> u64 {
    let mut hasher = DefaultHasher::new();
    // Bucket widths: 5% volume, 20Hz pitch, 0.5 words/sec
    ((volume * 20.0) as u32).hash(&mut hasher);
    ((pitch / 20.0) as u32).hash(&mut hasher);
    ((rate * 2.0) as u32).hash(&mut hasher);
    hasher.finish()
}

//! Session-scoped speaker identification

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use voice_floor_config::SpeakerSettings;

use crate::enrollment::{EnrolledSpeakerProfile, EnrollmentStore};
use crate::features::{FeatureExtractor, VoiceFeatures};
use crate::record::SpeakerRecord;
use crate::SpeakerError;

/// Outcome of identifying one utterance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identification {
    /// Speaker the utterance is attributed to
    pub speaker_id: String,
    /// Confidence in the attribution (0.0 - 0.99)
    pub confidence: f32,
    /// Whether this utterance minted a new speaker
    pub newly_minted: bool,
}

/// Per-session speaker state
#[derive(Debug, Default)]
struct SessionSpeakers {
    records: Vec<SpeakerRecord>,
}

/// Identifies which speaker produced an utterance within a session
///
/// Per-session state is keyed by session id; unrelated sessions never
/// contend. The registry initializes and removes sessions as part of its
/// lifecycle cascade.
pub struct SpeakerIdentifier {
    extractor: Arc<dyn FeatureExtractor>,
    settings: SpeakerSettings,
    sessions: DashMap<String, Mutex<SessionSpeakers>>,
    enrolled: EnrollmentStore,
}

impl SpeakerIdentifier {
    pub fn new(extractor: Arc<dyn FeatureExtractor>, settings: SpeakerSettings) -> Self {
        Self {
            extractor,
            settings,
            sessions: DashMap::new(),
            enrolled: EnrollmentStore::new(),
        }
    }

    /// Create per-session speaker state; idempotent
    pub fn initialize_session(&self, session_id: &str) {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Mutex::new(SessionSpeakers::default()));
    }

    /// Tear down per-session speaker state; missing session is a no-op
    pub fn remove_session(&self, session_id: &str) {
        if self.sessions.remove(session_id).is_some() {
            tracing::debug!(session_id = %session_id, "speaker state removed");
        }
    }

    /// Whether the session has been initialized
    pub fn has_session(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Identify the speaker of an utterance
    ///
    /// Matches the extracted features against every known speaker record in
    /// the session. Best similarity above the match threshold reuses that
    /// speaker and folds the sample into its running average; otherwise a
    /// new `Speaker_N` is minted.
    pub fn identify(
        &self,
        session_id: &str,
        audio: &[u8],
        transcript: &str,
    ) -> Result<Identification, SpeakerError> {
        if audio.is_empty() {
            return Err(SpeakerError::InvalidInput("no audio data".to_string()));
        }

        let entry = self
            .sessions
            .get(session_id)
            .ok_or_else(|| SpeakerError::SessionNotInitialized(session_id.to_string()))?;

        let features = self.extractor.extract(audio, transcript)?;

        let mut state = entry.lock();

        let best = state
            .records
            .iter_mut()
            .map(|record| {
                let score = record.similarity(&features);
                (record, score)
            })
            .max_by(|(_, a), (_, b)| a.total_cmp(b));

        if let Some((record, score)) = best {
            if score > self.settings.match_threshold {
                let bonus = (record.sample_count as f32 * self.settings.confidence_bonus_step)
                    .min(self.settings.confidence_bonus_cap);
                let confidence = (score + bonus).min(self.settings.confidence_cap);

                record.observe(&features, transcript);
                let speaker_id = record.speaker_id.clone();

                tracing::debug!(
                    session_id = %session_id,
                    speaker_id = %speaker_id,
                    similarity = format!("{:.2}", score),
                    confidence = format!("{:.2}", confidence),
                    "speaker re-identified"
                );

                return Ok(Identification {
                    speaker_id,
                    confidence,
                    newly_minted: false,
                });
            }
        }

        let speaker_id = format!("Speaker_{}", state.records.len() + 1);
        state
            .records
            .push(SpeakerRecord::new(&speaker_id, features, transcript));

        tracing::info!(
            session_id = %session_id,
            speaker_id = %speaker_id,
            "new speaker detected"
        );

        Ok(Identification {
            speaker_id,
            confidence: self.settings.new_speaker_confidence,
            newly_minted: true,
        })
    }

    /// Number of distinct speakers detected in a session
    pub fn speaker_count(&self, session_id: &str) -> Result<usize, SpeakerError> {
        let entry = self
            .sessions
            .get(session_id)
            .ok_or_else(|| SpeakerError::SessionNotInitialized(session_id.to_string()))?;
        let count = entry.lock().records.len();
        Ok(count)
    }

    /// Snapshot of the session's speaker records
    pub fn session_speakers(&self, session_id: &str) -> Result<Vec<SpeakerRecord>, SpeakerError> {
        let entry = self
            .sessions
            .get(session_id)
            .ok_or_else(|| SpeakerError::SessionNotInitialized(session_id.to_string()))?;
        let records = entry.lock().records.clone();
        Ok(records)
    }

    /// Enroll a speaker from explicit audio samples
    ///
    /// Cross-session: the profile outlives any live session and is never
    /// consulted by [`identify`](Self::identify).
    pub fn enroll(
        &self,
        speaker_id: &str,
        audio_samples: &[Vec<u8>],
    ) -> Result<usize, SpeakerError> {
        if audio_samples.is_empty() || audio_samples.iter().all(|a| a.is_empty()) {
            return Err(SpeakerError::InvalidInput(
                "enrollment requires at least one non-empty sample".to_string(),
            ));
        }

        let mut features = Vec::with_capacity(audio_samples.len());
        for audio in audio_samples.iter().filter(|a| !a.is_empty()) {
            features.push(self.extractor.extract(audio, "")?);
        }

        let total = self.enrolled.add_samples(speaker_id, features);
        tracing::info!(
            speaker_id = %speaker_id,
            total_samples = total,
            "speaker enrolled"
        );
        Ok(total)
    }

    /// Read back an enrolled profile, if present
    pub fn enrolled_profile(&self, speaker_id: &str) -> Option<EnrolledSpeakerProfile> {
        self.enrolled.get(speaker_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Extractor that reads the first byte as the whole feature vector,
    /// letting tests choose "voices" precisely
    struct ByteExtractor;

    impl FeatureExtractor for ByteExtractor {
        fn extract(&self, audio: &[u8], transcript: &str) -> Result<VoiceFeatures, SpeakerError> {
            if audio.is_empty() {
                return Err(SpeakerError::InvalidInput("no audio data".to_string()));
            }
            let v = audio[0] as f32 / 255.0;
            Ok(VoiceFeatures {
                volume: v,
                pitch: 100.0 + v * 100.0,
                rate: transcript.split_whitespace().count() as f32,
                fingerprint: audio[0] as u64,
            })
        }

        fn name(&self) -> &str {
            "byte"
        }
    }

    fn identifier() -> SpeakerIdentifier {
        SpeakerIdentifier::new(Arc::new(ByteExtractor), SpeakerSettings::default())
    }

    #[test]
    fn test_uninitialized_session_errors() {
        let id = identifier();
        assert!(matches!(
            id.identify("missing", &[100, 0, 0], "hi"),
            Err(SpeakerError::SessionNotInitialized(_))
        ));
    }

    #[test]
    fn test_empty_audio_errors() {
        let id = identifier();
        id.initialize_session("s1");
        assert!(matches!(
            id.identify("s1", &[], "hi"),
            Err(SpeakerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_first_speaker_minted_with_base_confidence() {
        let id = identifier();
        id.initialize_session("s1");

        let result = id.identify("s1", &[100, 0, 0, 0], "hello there").unwrap();
        assert_eq!(result.speaker_id, "Speaker_1");
        assert_eq!(result.confidence, 0.5);
        assert!(result.newly_minted);
    }

    #[test]
    fn test_identification_idempotent_with_rising_confidence() {
        let id = identifier();
        id.initialize_session("s1");
        let audio = [100u8, 0, 0, 0];

        let first = id.identify("s1", &audio, "same words here").unwrap();
        let second = id.identify("s1", &audio, "same words here").unwrap();
        let third = id.identify("s1", &audio, "same words here").unwrap();

        assert_eq!(first.speaker_id, second.speaker_id);
        assert_eq!(second.speaker_id, third.speaker_id);
        assert!(second.confidence >= first.confidence);
        assert!(third.confidence >= second.confidence);
        assert!(third.confidence <= 0.99);
        assert!(!second.newly_minted);
    }

    #[test]
    fn test_distinct_voice_mints_new_speaker() {
        let id = identifier();
        id.initialize_session("s1");

        let a = id.identify("s1", &[20, 0, 0, 0], "one two three").unwrap();
        let b = id.identify("s1", &[230, 0, 0, 0], "completely different cadence").unwrap();

        assert_eq!(a.speaker_id, "Speaker_1");
        assert_eq!(b.speaker_id, "Speaker_2");
        assert_eq!(id.speaker_count("s1").unwrap(), 2);
    }

    #[test]
    fn test_remove_session_clears_state() {
        let id = identifier();
        id.initialize_session("s1");
        id.identify("s1", &[100, 0], "hi").unwrap();

        id.remove_session("s1");
        assert!(!id.has_session("s1"));
        assert!(id.speaker_count("s1").is_err());

        // Removing again is a no-op
        id.remove_session("s1");
    }

    #[test]
    fn test_enrollment_is_independent_of_sessions() {
        let id = identifier();
        id.initialize_session("s1");

        id.enroll("alice", &[vec![50, 0], vec![52, 0]]).unwrap();
        assert_eq!(id.enrolled_profile("alice").unwrap().samples.len(), 2);

        // Live identification in the session never saw "alice"
        let result = id.identify("s1", &[50, 0], "hello").unwrap();
        assert_eq!(result.speaker_id, "Speaker_1");

        // Ending the session leaves enrollment intact
        id.remove_session("s1");
        assert!(id.enrolled_profile("alice").is_some());
    }

    #[test]
    fn test_enroll_rejects_empty() {
        let id = identifier();
        assert!(id.enroll("alice", &[]).is_err());
        assert!(id.enroll("alice", &[vec![]]).is_err());
    }
}

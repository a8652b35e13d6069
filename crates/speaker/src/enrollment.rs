//! Cross-session speaker enrollment
//!
//! Enrollment profiles accumulate explicitly submitted voice samples and are
//! independent of any live session's lifetime. Live identification never
//! reads or writes them; they exist for persistent biometric onboarding.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::features::VoiceFeatures;

/// Cross-session enrolled profile for one speaker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrolledSpeakerProfile {
    /// Caller-chosen speaker id
    pub speaker_id: String,
    /// Feature samples accumulated from enrollment calls
    pub samples: Vec<VoiceFeatures>,
    /// When the profile was first created
    pub created_at: DateTime<Utc>,
}

impl EnrolledSpeakerProfile {
    fn new(speaker_id: impl Into<String>) -> Self {
        Self {
            speaker_id: speaker_id.into(),
            samples: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// In-memory store of enrolled profiles
#[derive(Debug, Default)]
pub struct EnrollmentStore {
    profiles: RwLock<HashMap<String, EnrolledSpeakerProfile>>,
}

impl EnrollmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append feature samples to a profile, creating it if absent
    pub fn add_samples(&self, speaker_id: &str, samples: Vec<VoiceFeatures>) -> usize {
        let mut profiles = self.profiles.write();
        let profile = profiles
            .entry(speaker_id.to_string())
            .or_insert_with(|| EnrolledSpeakerProfile::new(speaker_id));
        profile.samples.extend(samples);
        profile.samples.len()
    }

    /// Snapshot of a profile, if enrolled
    pub fn get(&self, speaker_id: &str) -> Option<EnrolledSpeakerProfile> {
        self.profiles.read().get(speaker_id).cloned()
    }

    /// Number of enrolled speakers
    pub fn len(&self) -> usize {
        self.profiles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(volume: f32) -> VoiceFeatures {
        VoiceFeatures {
            volume,
            pitch: 120.0,
            rate: 2.0,
            fingerprint: 9,
        }
    }

    #[test]
    fn test_enrollment_accumulates() {
        let store = EnrollmentStore::new();
        assert_eq!(store.add_samples("alice", vec![sample(0.3)]), 1);
        assert_eq!(store.add_samples("alice", vec![sample(0.4), sample(0.5)]), 3);

        let profile = store.get("alice").unwrap();
        assert_eq!(profile.speaker_id, "alice");
        assert_eq!(profile.samples.len(), 3);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_missing_profile() {
        let store = EnrollmentStore::new();
        assert!(store.get("nobody").is_none());
    }
}

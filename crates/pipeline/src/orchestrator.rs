//! The utterance orchestrator
//!
//! Sequences the full pipeline for each utterance:
//!
//! ```text
//! validate ─▶ transcribe ─▶ identify ─▶ authorize ─▶ resolve ─▶ synthesize ─▶ dispatch
//!    │            │             │           │            │           │
//!    └── every stage short-circuits into a typed, message-carrying result ──┘
//! ```
//!
//! Only transcription, resolution, synthesis, and dispatch suspend; all
//! session/turn/speaker mutation is synchronous and never spans an await.

use std::sync::Arc;

use voice_floor_config::AudioSettings;
use voice_floor_core::{
    CommandResult, ContextResolver, Delivery, FailureKind, Synthesizer, Transcriber, Transcript,
};
use voice_floor_session::{Interaction, SessionConfig, SessionRegistry, SessionStats};
use voice_floor_speaker::SpeakerError;
use voice_floor_turns::TurnOutcome;

use crate::phrasing::PhraseBook;
use crate::resolver::RuleBasedResolver;
use crate::PipelineError;

/// Top-level pipeline orchestrator
///
/// All collaborators are constructor-injected; nothing here reaches for
/// ambient singletons, so every stage can be exercised in isolation.
pub struct Orchestrator {
    registry: Arc<SessionRegistry>,
    transcriber: Arc<dyn Transcriber>,
    fallback_transcriber: Option<Arc<dyn Transcriber>>,
    synthesizer: Arc<dyn Synthesizer>,
    resolver: Arc<dyn ContextResolver>,
    commands: RuleBasedResolver,
    delivery: Arc<dyn Delivery>,
    phrasing: PhraseBook,
    audio: AudioSettings,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<SessionRegistry>,
        transcriber: Arc<dyn Transcriber>,
        synthesizer: Arc<dyn Synthesizer>,
        resolver: Arc<dyn ContextResolver>,
        delivery: Arc<dyn Delivery>,
        audio: AudioSettings,
    ) -> Self {
        Self {
            registry,
            transcriber,
            fallback_transcriber: None,
            synthesizer,
            resolver,
            commands: RuleBasedResolver::new(),
            delivery,
            phrasing: PhraseBook::new(),
            audio,
        }
    }

    /// Set a fallback transcription provider, tried once when the primary
    /// fails
    pub fn with_fallback_transcriber(mut self, fallback: Arc<dyn Transcriber>) -> Self {
        self.fallback_transcriber = Some(fallback);
        self
    }

    /// Replace the phrasing source (seed it for deterministic tests)
    pub fn with_phrasing(mut self, phrasing: PhraseBook) -> Self {
        self.phrasing = phrasing;
        self
    }

    /// Start a session and return its initial stats
    pub async fn start_session(
        &self,
        session_id: &str,
        client_id: &str,
        config: SessionConfig,
    ) -> Result<SessionStats, PipelineError> {
        self.registry.start(session_id, client_id, config).await?;
        Ok(self.registry.stats(session_id)?)
    }

    /// End a session; idempotent
    pub fn end_session(&self, session_id: &str) {
        self.registry.end(session_id);
    }

    /// Point-in-time stats for a session
    pub fn session_stats(&self, session_id: &str) -> Result<SessionStats, PipelineError> {
        Ok(self.registry.stats(session_id)?)
    }

    /// Process one utterance through the full pipeline
    ///
    /// Always returns a message-carrying result; failures, rejections, and
    /// queueing verdicts are all encoded, never silently dropped. Utterances
    /// for the same session process in submission order.
    pub async fn handle_utterance(
        &self,
        session_id: &str,
        audio: &[u8],
        current_context: &str,
    ) -> CommandResult {
        // Stage 1: session lookup
        let handle = match self.registry.get(session_id) {
            Ok(handle) => handle,
            Err(_) => {
                return CommandResult::failure(
                    session_id,
                    FailureKind::SessionNotFound,
                    "I don't have an active session for that request.",
                );
            }
        };

        // Utterances for one session queue behind each other here; unrelated
        // sessions proceed in parallel
        let _admission = handle.admit().await;
        if handle.is_closed() {
            return self.closed_result(session_id);
        }

        // Stage 2: audio validation
        if let Some(result) = self.validate_audio(session_id, audio) {
            return result;
        }

        let (language, tts_enabled, voice_model, client_id, last_response) = {
            let mut session = handle.write();
            session.current_context = current_context.to_string();
            session.touch();
            if session.paused {
                return CommandResult::turn_management(
                    session_id,
                    "This session is paused; resume it before speaking.",
                );
            }
            (
                session.config.language.clone(),
                session.config.tts_enabled,
                session.config.voice_model.clone(),
                session.client_id.clone(),
                session.last_response.clone(),
            )
        };

        // Stage 3: transcription, one fallback attempt
        let transcript = match self.transcribe(session_id, audio, &language).await {
            Ok(transcript) => transcript,
            Err(result) => return result,
        };
        if handle.is_closed() {
            return self.closed_result(session_id);
        }
        if transcript.is_empty() {
            return CommandResult::failure(
                session_id,
                FailureKind::InvalidInput,
                self.phrasing.empty_speech(),
            )
            .with_transcript(transcript.text);
        }

        // Stage 4: speaker identification (in-memory, no suspension)
        let identification =
            match self
                .registry
                .speakers()
                .identify(session_id, audio, &transcript.text)
            {
                Ok(identification) => identification,
                Err(SpeakerError::SessionNotInitialized(_)) => {
                    return self.closed_result(session_id);
                }
                Err(SpeakerError::InvalidInput(message)) => {
                    return CommandResult::failure(session_id, FailureKind::InvalidInput, message);
                }
            };

        tracing::debug!(
            session_id = %session_id,
            speaker_id = %identification.speaker_id,
            confidence = format!("{:.2}", identification.confidence),
            transcript = %transcript.text,
            "utterance attributed"
        );

        // Stage 5: turn authorization (in-memory, no suspension)
        let outcome = match self.registry.turns().process_turn(
            session_id,
            &identification.speaker_id,
            &transcript.text,
        ) {
            Ok(outcome) => outcome,
            Err(_) => return self.closed_result(session_id),
        };

        let accepted = match outcome {
            TurnOutcome::Accepted { signals, .. } => signals,
            TurnOutcome::Rejected { reason } => {
                let text = self.phrasing.rejection(&reason);
                return self
                    .finish_turn_management(&handle, session_id, text, tts_enabled, &voice_model)
                    .await
                    .with_transcript(transcript.text)
                    .with_speaker(identification.speaker_id, identification.confidence);
            }
            TurnOutcome::Queued { reason } => {
                let text = self.phrasing.queued(&reason);
                return self
                    .finish_turn_management(&handle, session_id, text, tts_enabled, &voice_model)
                    .await
                    .with_transcript(transcript.text)
                    .with_speaker(identification.speaker_id, identification.confidence);
            }
            TurnOutcome::Interrupted => {
                let text = self.phrasing.interrupted();
                return self
                    .finish_turn_management(&handle, session_id, text, tts_enabled, &voice_model)
                    .await
                    .with_transcript(transcript.text)
                    .with_speaker(identification.speaker_id, identification.confidence);
            }
        };

        if accepted.ending_detected {
            tracing::info!(session_id = %session_id, "conversation ending detected");
        }

        // Stage 6: response resolution, context-aware first
        let response_text = self
            .resolve_response(&transcript.text, current_context, &client_id, last_response)
            .await;
        if handle.is_closed() {
            return self.closed_result(session_id);
        }

        // Stage 7: synthesis, degrading to text-only on failure
        let audio_out = self
            .synthesize(session_id, &response_text, tts_enabled, &voice_model)
            .await;
        if handle.is_closed() {
            return self.closed_result(session_id);
        }

        // Stage 8: dispatch and history update
        self.deliver(session_id, &response_text, audio_out.as_deref())
            .await;

        {
            let mut session = handle.write();
            session.record_interaction(Interaction::new(
                &identification.speaker_id,
                &transcript.text,
                &response_text,
            ));
        }

        let mut result = CommandResult::answer(session_id, response_text)
            .with_transcript(transcript.text)
            .with_speaker(identification.speaker_id, identification.confidence);
        if let Some(audio_out) = audio_out {
            result = result.with_audio(audio_out);
        }
        result
    }

    /// Push text directly to the session without running the pipeline
    ///
    /// Used for prompts and other coordinator-initiated speech; does not
    /// touch turn or speaker state.
    pub async fn speak_text(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<CommandResult, PipelineError> {
        let handle = self.registry.get(session_id)?;

        let (tts_enabled, voice_model) = {
            let session = handle.read();
            (
                session.config.tts_enabled,
                session.config.voice_model.clone(),
            )
        };

        let audio_out = self
            .synthesize(session_id, text, tts_enabled, &voice_model)
            .await;
        self.deliver(session_id, text, audio_out.as_deref()).await;

        handle.write().touch();

        let mut result = CommandResult::answer(session_id, text);
        if let Some(audio_out) = audio_out {
            result = result.with_audio(audio_out);
        }
        Ok(result)
    }

    /// Speak a silence prompt if a pending question has waited too long
    pub async fn prompt_if_silent(
        &self,
        session_id: &str,
    ) -> Result<Option<CommandResult>, PipelineError> {
        if !self.registry.turns().silence_prompt_due(session_id)? {
            return Ok(None);
        }
        let prompt = self.phrasing.silence_prompt();
        tracing::info!(session_id = %session_id, "prompting for overdue response");
        self.speak_text(session_id, &prompt).await.map(Some)
    }

    /// Audio size validation; `None` means the audio is acceptable
    fn validate_audio(&self, session_id: &str, audio: &[u8]) -> Option<CommandResult> {
        if audio.is_empty() {
            return Some(CommandResult::failure(
                session_id,
                FailureKind::InvalidInput,
                "No audio was received for that utterance.",
            ));
        }
        if audio.len() < self.audio.min_bytes {
            return Some(CommandResult::failure(
                session_id,
                FailureKind::InvalidInput,
                "That audio clip was too short to process.",
            ));
        }
        if audio.len() > self.audio.max_bytes {
            return Some(CommandResult::failure(
                session_id,
                FailureKind::InvalidInput,
                "That audio clip was too long to process in one utterance.",
            ));
        }
        None
    }

    /// Transcribe with one fallback attempt
    async fn transcribe(
        &self,
        session_id: &str,
        audio: &[u8],
        language: &str,
    ) -> Result<Transcript, CommandResult> {
        match self.transcriber.transcribe(audio, language).await {
            Ok(transcript) => Ok(transcript),
            Err(primary_err) => {
                tracing::warn!(
                    session_id = %session_id,
                    provider = self.transcriber.name(),
                    error = %primary_err,
                    "primary transcription failed"
                );

                if let Some(fallback) = &self.fallback_transcriber {
                    match fallback.transcribe(audio, language).await {
                        Ok(transcript) => {
                            tracing::info!(
                                session_id = %session_id,
                                provider = fallback.name(),
                                "fallback transcription succeeded"
                            );
                            return Ok(transcript);
                        }
                        Err(fallback_err) => {
                            tracing::error!(
                                session_id = %session_id,
                                provider = fallback.name(),
                                error = %fallback_err,
                                "fallback transcription failed"
                            );
                        }
                    }
                }

                Err(CommandResult::failure(
                    session_id,
                    FailureKind::Transcription,
                    self.phrasing.transcription_failure(),
                ))
            }
        }
    }

    /// Resolve a response: context-aware resolver first, rule-based fallback
    async fn resolve_response(
        &self,
        query: &str,
        context: &str,
        client_id: &str,
        last_response: Option<String>,
    ) -> String {
        match self.resolver.resolve(query, context, client_id).await {
            Ok(resolution) if resolution.is_relevant() => {
                tracing::debug!(
                    resolver = self.resolver.name(),
                    relevant_results = resolution.relevant_results,
                    "context resolver answered"
                );
                resolution.text
            }
            Ok(_) => {
                self.commands
                    .resolve(query, last_response.as_deref(), &self.phrasing)
                    .text
            }
            Err(e) => {
                tracing::warn!(
                    resolver = self.resolver.name(),
                    error = %e,
                    "context resolver failed, using rule-based fallback"
                );
                self.commands
                    .resolve(query, last_response.as_deref(), &self.phrasing)
                    .text
            }
        }
    }

    /// Synthesize when enabled; failure degrades to text-only
    async fn synthesize(
        &self,
        session_id: &str,
        text: &str,
        tts_enabled: bool,
        voice_model: &str,
    ) -> Option<Vec<u8>> {
        if !tts_enabled {
            return None;
        }
        match self.synthesizer.synthesize(text, voice_model).await {
            Ok(audio) => Some(audio),
            Err(e) => {
                tracing::warn!(
                    session_id = %session_id,
                    provider = self.synthesizer.name(),
                    error = %e,
                    "synthesis failed, delivering text-only response"
                );
                None
            }
        }
    }

    /// Fire-and-forget delivery; failures are logged, never propagated
    async fn deliver(&self, session_id: &str, text: &str, audio: Option<&[u8]>) {
        if let Err(e) = self.delivery.deliver(session_id, text, audio).await {
            tracing::warn!(
                session_id = %session_id,
                error = %e,
                "delivery failed"
            );
        }
    }

    /// Terminal handling for rejected/queued/interrupted turns
    ///
    /// Turn-management messages are spoken and delivered like any response,
    /// but are not recorded as interactions: no turn was accepted.
    async fn finish_turn_management(
        &self,
        handle: &Arc<voice_floor_session::SessionHandle>,
        session_id: &str,
        text: String,
        tts_enabled: bool,
        voice_model: &str,
    ) -> CommandResult {
        let audio_out = self
            .synthesize(session_id, &text, tts_enabled, voice_model)
            .await;
        if handle.is_closed() {
            return self.closed_result(session_id);
        }
        self.deliver(session_id, &text, audio_out.as_deref()).await;

        let mut result = CommandResult::turn_management(session_id, text);
        if let Some(audio_out) = audio_out {
            result = result.with_audio(audio_out);
        }
        result
    }

    fn closed_result(&self, session_id: &str) -> CommandResult {
        CommandResult::failure(
            session_id,
            FailureKind::SessionClosed,
            "That session ended before the utterance finished processing.",
        )
    }

    /// The registry this orchestrator drives; exposed for enrollment flows
    /// and management surfaces
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use voice_floor_config::{SessionSettings, SpeakerSettings, TurnSettings};
    use voice_floor_core::{NoPreferences, Resolution, Result as CoreResult};
    use voice_floor_speaker::{HeuristicFeatureExtractor, SpeakerIdentifier};
    use voice_floor_turns::TurnCoordinator;

    struct EchoResolver;

    #[async_trait]
    impl ContextResolver for EchoResolver {
        async fn resolve(&self, query: &str, _: &str, _: &str) -> CoreResult<Resolution> {
            Ok(Resolution::new(format!("about: {}", query), 1))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    struct SilentSynthesizer;

    #[async_trait]
    impl Synthesizer for SilentSynthesizer {
        async fn synthesize(&self, _: &str, _: &str) -> CoreResult<Vec<u8>> {
            Ok(vec![0u8; 8])
        }

        fn name(&self) -> &str {
            "silent"
        }
    }

    struct FixedTranscriber;

    #[async_trait]
    impl Transcriber for FixedTranscriber {
        async fn transcribe(&self, _: &[u8], _: &str) -> CoreResult<Transcript> {
            Ok(Transcript::new("hello", 0.9, self.name()))
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct NullDelivery;

    #[async_trait]
    impl Delivery for NullDelivery {
        async fn deliver(&self, _: &str, _: &str, _: Option<&[u8]>) -> CoreResult<()> {
            Ok(())
        }
    }

    fn orchestrator() -> Orchestrator {
        let speakers = Arc::new(SpeakerIdentifier::new(
            Arc::new(HeuristicFeatureExtractor::new(16_000)),
            SpeakerSettings::default(),
        ));
        let turns = Arc::new(TurnCoordinator::new(TurnSettings::default()));
        let registry = Arc::new(SessionRegistry::new(
            speakers,
            turns,
            Arc::new(NoPreferences),
            SessionSettings::default(),
        ));

        Orchestrator::new(
            registry,
            Arc::new(FixedTranscriber),
            Arc::new(SilentSynthesizer),
            Arc::new(EchoResolver),
            Arc::new(NullDelivery),
            AudioSettings {
                min_bytes: 10,
                max_bytes: 100,
                sample_rate: 16_000,
            },
        )
        .with_phrasing(PhraseBook::seeded(1))
    }

    #[test]
    fn test_validate_audio_bounds() {
        let orch = orchestrator();

        let empty = orch.validate_audio("s1", &[]).unwrap();
        assert_eq!(empty.kind, voice_floor_core::ResponseKind::Failure(FailureKind::InvalidInput));

        let short = orch.validate_audio("s1", &[0u8; 4]).unwrap();
        assert!(short.text.contains("too short"));

        let long = orch.validate_audio("s1", &[0u8; 500]).unwrap();
        assert!(long.text.contains("too long"));

        assert!(orch.validate_audio("s1", &[0u8; 50]).is_none());
    }

    #[tokio::test]
    async fn test_unknown_session_is_typed_failure() {
        let orch = orchestrator();
        let result = orch.handle_utterance("missing", &[0u8; 50], "").await;
        assert_eq!(
            result.kind,
            voice_floor_core::ResponseKind::Failure(FailureKind::SessionNotFound)
        );
        assert!(!result.text.is_empty());
    }
}

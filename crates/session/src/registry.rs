//! Session registry
//!
//! Owns the lifecycle of active voice sessions. `start` also initializes the
//! speaker identifier's and turn coordinator's per-session sub-state so a
//! session never exists without both; `end` tears all three down and marks
//! the handle closed so in-flight pipeline work discards its late results.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::watch;

use voice_floor_config::SessionSettings;
use voice_floor_core::PreferencesStore;
use voice_floor_speaker::SpeakerIdentifier;
use voice_floor_turns::TurnCoordinator;

use crate::session::{SessionConfig, SessionStats, VoiceSession};
use crate::SessionError;

/// Shared handle to one live session
pub struct SessionHandle {
    session_id: String,
    inner: RwLock<VoiceSession>,
    /// Admission gate serializing utterances for this session; held across
    /// the pipeline so submissions process in order
    gate: tokio::sync::Mutex<()>,
    /// Set at end; late pipeline results check this and discard
    closed: AtomicBool,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Read access to the session state; never hold across an await
    pub fn read(&self) -> parking_lot::RwLockReadGuard<'_, VoiceSession> {
        self.inner.read()
    }

    /// Write access to the session state; never hold across an await
    pub fn write(&self) -> parking_lot::RwLockWriteGuard<'_, VoiceSession> {
        self.inner.write()
    }

    /// Acquire the admission gate; utterances for this session queue here
    pub async fn admit(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.gate.lock().await
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Registry of active voice sessions
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<SessionHandle>>,
    speakers: Arc<SpeakerIdentifier>,
    turns: Arc<TurnCoordinator>,
    preferences: Arc<dyn PreferencesStore>,
    settings: SessionSettings,
}

impl SessionRegistry {
    pub fn new(
        speakers: Arc<SpeakerIdentifier>,
        turns: Arc<TurnCoordinator>,
        preferences: Arc<dyn PreferencesStore>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            speakers,
            turns,
            preferences,
            settings,
        }
    }

    /// Start a new session
    ///
    /// Reads the preferences store once to personalize the config, then
    /// creates the session together with its speaker and turn sub-state.
    pub async fn start(
        &self,
        session_id: &str,
        client_id: &str,
        config: SessionConfig,
    ) -> Result<Arc<SessionHandle>, SessionError> {
        if self.sessions.contains_key(session_id) {
            return Err(SessionError::AlreadyExists(session_id.to_string()));
        }

        if self.sessions.len() >= self.settings.max_sessions {
            self.cleanup_expired();
            if self.sessions.len() >= self.settings.max_sessions {
                return Err(SessionError::Capacity {
                    max: self.settings.max_sessions,
                });
            }
        }

        // Personalization is best-effort: a failing preferences store must
        // not block session creation
        let config = match self.preferences.profile(client_id).await {
            Ok(Some(profile)) => config.personalize(&profile),
            Ok(None) => config,
            Err(e) => {
                tracing::warn!(
                    client_id = %client_id,
                    error = %e,
                    "preferences lookup failed, using unpersonalized config"
                );
                config
            }
        };

        let mode = config.mode;
        let handle = Arc::new(SessionHandle {
            session_id: session_id.to_string(),
            inner: RwLock::new(VoiceSession::new(
                session_id,
                client_id,
                config,
                self.settings.history_limit,
            )),
            gate: tokio::sync::Mutex::new(()),
            closed: AtomicBool::new(false),
        });

        // Sub-state first, so the session is fully wired the moment it is
        // visible in the map
        self.speakers.initialize_session(session_id);
        self.turns.initialize_session(session_id, mode);

        match self.sessions.entry(session_id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                // Lost a race with a concurrent start for the same id. The
                // winner shares the sub-state we just initialized, so leave
                // it in place.
                return Err(SessionError::AlreadyExists(session_id.to_string()));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(handle.clone());
            }
        }

        tracing::info!(
            session_id = %session_id,
            client_id = %client_id,
            mode = %mode,
            "session started"
        );

        Ok(handle)
    }

    /// Start a session with a freshly generated id
    ///
    /// For callers that do not bring their own session identifier.
    pub async fn start_generated(
        &self,
        client_id: &str,
        config: SessionConfig,
    ) -> Result<Arc<SessionHandle>, SessionError> {
        let session_id = uuid::Uuid::new_v4().to_string();
        self.start(&session_id, client_id, config).await
    }

    /// Get a session by id
    pub fn get(&self, session_id: &str) -> Result<Arc<SessionHandle>, SessionError> {
        self.sessions
            .get(session_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    /// End a session; idempotent, ending a missing session is a no-op
    ///
    /// The VoiceSession entry, turn state, and speaker records are all
    /// removed before this returns.
    pub fn end(&self, session_id: &str) {
        if let Some((_, handle)) = self.sessions.remove(session_id) {
            handle.close();
            self.turns.remove_session(session_id);
            self.speakers.remove_session(session_id);
            tracing::info!(session_id = %session_id, "session ended");
        }
    }

    /// Point-in-time statistics for a session
    pub fn stats(&self, session_id: &str) -> Result<SessionStats, SessionError> {
        let handle = self.get(session_id)?;
        let turn_snapshot = self
            .turns
            .snapshot(session_id)
            .map_err(|_| SessionError::NotFound(session_id.to_string()))?;
        let speaker_count = self
            .speakers
            .speaker_count(session_id)
            .map_err(|_| SessionError::NotFound(session_id.to_string()))?;

        let session = handle.read();
        Ok(SessionStats {
            session_id: session.session_id.clone(),
            client_id: session.client_id.clone(),
            mode: turn_snapshot.mode,
            lifecycle: turn_snapshot.lifecycle,
            interaction_count: session.interaction_count,
            speaker_count,
            turn_count: turn_snapshot.turn_count,
            queued_count: turn_snapshot.queued_count,
            waiting_for_response: turn_snapshot.waiting_for_response,
            uptime_secs: session.uptime().as_secs(),
            paused: session.paused,
            last_response: session.last_response.clone(),
        })
    }

    /// The speaker identifier whose per-session state this registry manages
    pub fn speakers(&self) -> &Arc<SpeakerIdentifier> {
        &self.speakers
    }

    /// The turn coordinator whose per-session state this registry manages
    pub fn turns(&self) -> &Arc<TurnCoordinator> {
        &self.turns
    }

    /// Active session count
    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    /// List all session ids
    pub fn list(&self) -> Vec<String> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }

    /// Sweep sessions idle past the timeout
    pub fn cleanup_expired(&self) {
        let timeout = self.settings.idle_timeout();
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().read().is_expired(timeout))
            .map(|entry| entry.key().clone())
            .collect();

        for session_id in expired {
            tracing::info!(session_id = %session_id, "session expired");
            self.end(&session_id);
        }
    }

    /// Start a background task that periodically sweeps expired sessions
    ///
    /// Returns a shutdown sender; send `true` to stop the task.
    pub fn start_cleanup_task(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let registry = Arc::clone(self);
        let interval = registry.settings.cleanup_interval();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let before = registry.count();
                        registry.cleanup_expired();
                        let after = registry.count();
                        if before != after {
                            tracing::info!(
                                removed = before - after,
                                remaining = after,
                                "session cleanup sweep"
                            );
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("session cleanup task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }
}

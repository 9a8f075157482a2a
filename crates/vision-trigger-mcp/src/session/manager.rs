//! Policy session lifecycle: the shared policy, the reference store, and per-session turn state.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use vision_trigger::{
    InMemoryReferenceStore, NewReference, PlanMode, PlanOutcome, StoredReference,
    TriggerDecision, VisionTriggerPolicy, VisualTarget,
};

use crate::types::{McpError, McpResult};

/// Counters over the turns planned by this server.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TurnStats {
    pub turns: u64,
    pub triggered: u64,
    pub reuse: u64,
    pub fetch: u64,
    pub none: u64,
    pub degraded: u64,
}

/// Holds the policy, the reference store, and the current session.
pub struct PolicySessionManager {
    policy: VisionTriggerPolicy,
    store: Arc<InMemoryReferenceStore>,
    policy_path: Option<PathBuf>,
    current_session: u32,
    topic: Option<String>,
    last_targets: Vec<VisualTarget>,
    stats: TurnStats,
    started_at: i64,
}

impl PolicySessionManager {
    pub fn new(policy: VisionTriggerPolicy, policy_path: Option<PathBuf>) -> Self {
        tracing::info!(
            "Session 1 started. Policy: {} ({} patterns, {} concepts)",
            policy_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "built-in defaults".to_string()),
            policy.compiled().pattern_count(),
            policy.compiled().concept_count()
        );

        Self {
            policy,
            store: Arc::new(InMemoryReferenceStore::new()),
            policy_path,
            current_session: 1,
            topic: None,
            last_targets: Vec::new(),
            stats: TurnStats::default(),
            started_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Resolve, load and validate the policy, then start a session.
    pub fn open(explicit_policy: Option<&str>) -> McpResult<Self> {
        let path = crate::config::resolve_policy_path(explicit_policy)?;
        let policy = crate::config::load_policy(path.as_deref())?;
        Ok(Self::new(policy, path))
    }

    pub fn policy(&self) -> &VisionTriggerPolicy {
        &self.policy
    }

    pub fn store(&self) -> Arc<InMemoryReferenceStore> {
        self.store.clone()
    }

    pub fn policy_path(&self) -> Option<&PathBuf> {
        self.policy_path.as_ref()
    }

    pub fn current_session_id(&self) -> u32 {
        self.current_session
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    pub fn last_targets(&self) -> &[VisualTarget] {
        &self.last_targets
    }

    pub fn stats(&self) -> &TurnStats {
        &self.stats
    }

    pub fn started_at(&self) -> i64 {
        self.started_at
    }

    /// Start a new session, optionally with a topic label.
    pub fn start_session(&mut self, topic: Option<String>) -> u32 {
        self.current_session += 1;
        self.topic = topic
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        self.last_targets.clear();
        tracing::info!(
            "Started session {} (topic: {})",
            self.current_session,
            self.topic.as_deref().unwrap_or("none")
        );
        self.current_session
    }

    /// End the current session. Stored references outlive it.
    pub fn end_session(&mut self) -> u32 {
        let session_id = self.current_session;
        self.topic = None;
        self.last_targets.clear();
        tracing::info!("Ended session {session_id}");
        session_id
    }

    /// Record the outcome of a turn planned in session `session_id`.
    ///
    /// Counters always advance. The turn's targets only become the fallback
    /// save label when that session is still the current one.
    pub fn record_turn(
        &mut self,
        session_id: u32,
        decision: &TriggerDecision,
        outcome: &PlanOutcome,
    ) {
        self.stats.turns += 1;
        if decision.invoke {
            self.stats.triggered += 1;
            if session_id == self.current_session {
                self.last_targets = decision.targets.clone();
            } else {
                tracing::debug!(
                    "Turn planned in session {session_id} finished after session {} started",
                    self.current_session
                );
            }
        }
        match outcome.plan.mode {
            PlanMode::Reuse => self.stats.reuse += 1,
            PlanMode::Fetch => self.stats.fetch += 1,
            PlanMode::None => self.stats.none += 1,
        }
        if !outcome.warnings.is_empty() {
            self.stats.degraded += 1;
        }
    }

    /// Pick the label for a save: explicit, else the last turn's first target,
    /// else the session topic.
    pub fn resolve_label(&self, explicit: Option<&str>) -> McpResult<String> {
        explicit
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .or_else(|| self.last_targets.first().map(|t| t.to_string()))
            .or_else(|| self.topic.clone())
            .ok_or_else(|| {
                McpError::InvalidParams(
                    "No label given and no previous target or session topic to fall back on"
                        .to_string(),
                )
            })
    }

    /// Save user-selected images under a resolved label.
    pub fn save_reference(
        &self,
        explicit_label: Option<&str>,
        mut reference: NewReference,
    ) -> McpResult<StoredReference> {
        reference.label = self.resolve_label(explicit_label)?;
        Ok(self.store.save(reference)?)
    }

    pub fn reference(&self, id: u64) -> McpResult<StoredReference> {
        self.store.get(id).ok_or(McpError::ReferenceNotFound(id))
    }
}

//! The per-turn policy facade the orchestrator holds on to.

use std::path::Path;
use std::sync::Arc;

use crate::config::{CompiledPolicy, PolicyConfig};
use crate::lookup::ReferenceLookup;
use crate::phrase::{HeuristicChunker, PhraseExtractor};
use crate::plan::build_plan;
use crate::trigger::detect_trigger;
use crate::types::{PlanOutcome, PolicyResult, TriggerDecision};

/// Decides per turn whether to invoke vision tooling and how.
///
/// Holds only immutable state, so one instance can be shared across
/// sessions behind an `Arc`.
#[derive(Clone)]
pub struct VisionTriggerPolicy {
    config: PolicyConfig,
    compiled: Arc<CompiledPolicy>,
    extractor: Arc<dyn PhraseExtractor>,
}

impl std::fmt::Debug for VisionTriggerPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionTriggerPolicy")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl VisionTriggerPolicy {
    /// Validate `config` and build a policy using the heuristic chunker,
    /// which keeps the configured concept words inside phrases.
    pub fn new(config: PolicyConfig) -> PolicyResult<Self> {
        let compiled = config.compile()?;
        let chunker = HeuristicChunker::with_concepts(compiled.allowset.iter().cloned());
        Ok(Self {
            config,
            compiled: Arc::new(compiled),
            extractor: Arc::new(chunker),
        })
    }

    /// Validate `config` and build a policy with a custom phrase extractor.
    pub fn with_extractor(
        config: PolicyConfig,
        extractor: Arc<dyn PhraseExtractor>,
    ) -> PolicyResult<Self> {
        let compiled = config.compile()?;
        Ok(Self {
            config,
            compiled: Arc::new(compiled),
            extractor,
        })
    }

    /// Load and validate a policy document from disk.
    pub fn from_file(path: &Path) -> PolicyResult<Self> {
        tracing::info!("Loading policy from {}", path.display());
        Self::new(PolicyConfig::from_file(path)?)
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn compiled(&self) -> &CompiledPolicy {
        &self.compiled
    }

    pub fn detect_trigger(&self, utterance: &str) -> TriggerDecision {
        detect_trigger(&self.compiled, self.extractor.as_ref(), utterance)
    }

    pub async fn build_plan(
        &self,
        decision: &TriggerDecision,
        lookup: &dyn ReferenceLookup,
    ) -> PlanOutcome {
        build_plan(decision, lookup, &self.compiled).await
    }

    /// Like [`build_plan`](Self::build_plan) but overriding `use_saved_first`.
    pub async fn build_plan_with(
        &self,
        decision: &TriggerDecision,
        lookup: &dyn ReferenceLookup,
        use_saved_first: bool,
    ) -> PlanOutcome {
        if use_saved_first == self.compiled.use_saved_first {
            return self.build_plan(decision, lookup).await;
        }
        let overridden = self.compiled.with_use_saved_first(use_saved_first);
        build_plan(decision, lookup, &overridden).await
    }

    /// Run one full turn: detect, then plan.
    pub async fn plan_turn(
        &self,
        utterance: &str,
        lookup: &dyn ReferenceLookup,
    ) -> (TriggerDecision, PlanOutcome) {
        let decision = self.detect_trigger(utterance);
        let outcome = self.build_plan(&decision, lookup).await;
        (decision, outcome)
    }
}

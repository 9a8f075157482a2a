//! Plan building: reuse stored references, fetch new ones, or do nothing.

use crate::config::CompiledPolicy;
use crate::lookup::ReferenceLookup;
use crate::types::{
    Backend, LookupError, PlanOutcome, PlanWarning, TriggerDecision, VisionPlan,
};

/// Build the plan for one turn.
///
/// The lookup is consulted exactly once when the decision invokes vision
/// tooling and never otherwise. Lookup failures and timeouts degrade to a
/// fetch plan and are reported as warnings; this function never fails.
///
/// Must be polled inside a tokio runtime with the time driver enabled
/// (`enable_time`, or `#[tokio::main]`), since the lookup is bounded by
/// [`tokio::time::timeout`]; otherwise it panics.
pub async fn build_plan(
    decision: &TriggerDecision,
    lookup: &dyn ReferenceLookup,
    policy: &CompiledPolicy,
) -> PlanOutcome {
    if !decision.invoke {
        return PlanOutcome {
            plan: VisionPlan::none(),
            warnings: Vec::new(),
        };
    }

    let mut warnings = Vec::new();
    let bounded = tokio::time::timeout(policy.lookup_timeout, lookup.lookup(&decision.targets));
    let found = match bounded.await {
        Ok(Ok(refs)) => refs,
        Ok(Err(e)) => {
            tracing::warn!("Reference lookup failed, fetching instead: {e}");
            warnings.push(match e {
                LookupError::Timeout(after) => PlanWarning::LookupTimedOut {
                    after_ms: after.as_millis() as u64,
                },
                LookupError::Failed(message) => PlanWarning::LookupFailed { message },
            });
            Vec::new()
        }
        Err(_) => {
            tracing::warn!(
                "Reference lookup timed out after {:?}, fetching instead",
                policy.lookup_timeout
            );
            warnings.push(PlanWarning::LookupTimedOut {
                after_ms: policy.lookup_timeout.as_millis() as u64,
            });
            Vec::new()
        }
    };

    if !found.is_empty() && policy.use_saved_first {
        let mut references = found;
        references.truncate(policy.max_candidates);
        tracing::debug!("Reusing {} stored references", references.len());
        return PlanOutcome {
            plan: VisionPlan::reuse(decision.targets.clone(), references),
            warnings,
        };
    }

    let backend = select_backend(decision, policy);
    let threshold = policy.thresholds.get(backend);
    tracing::debug!(
        "Fetching new references with {backend} (threshold {threshold}, {} saved found)",
        found.len()
    );

    PlanOutcome {
        plan: VisionPlan::fetch(
            decision.targets.clone(),
            backend,
            threshold,
            policy.max_candidates,
        ),
        warnings,
    }
}

/// Default backend, flipped to the alternate when any style cue was seen.
pub fn select_backend(decision: &TriggerDecision, policy: &CompiledPolicy) -> Backend {
    if decision.style_cues.is_empty() {
        policy.backend_default
    } else {
        policy.backend_default.alternate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::config::PolicyConfig;
    use crate::types::{
        PlanMode, ReferenceLocation, ReferenceSource, StoredReference, TriggerReason,
        VisualTarget,
    };

    /// Lookup that returns a fixed result and counts calls.
    struct FixedLookup {
        result: Result<Vec<StoredReference>, LookupError>,
        calls: AtomicUsize,
    }

    impl FixedLookup {
        fn new(result: Result<Vec<StoredReference>, LookupError>) -> Self {
            Self {
                result,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReferenceLookup for FixedLookup {
        async fn lookup(
            &self,
            _targets: &[VisualTarget],
        ) -> Result<Vec<StoredReference>, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    struct SlowLookup;

    #[async_trait]
    impl ReferenceLookup for SlowLookup {
        async fn lookup(
            &self,
            _targets: &[VisualTarget],
        ) -> Result<Vec<StoredReference>, LookupError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![stored(1, "duck")])
        }
    }

    fn stored(id: u64, label: &str) -> StoredReference {
        StoredReference {
            id,
            label: label.to_string(),
            locations: vec![ReferenceLocation {
                storage_key: format!("refs/{id}.png"),
                url: format!("https://cdn.example.com/{id}.png"),
            }],
            source: ReferenceSource::default(),
            created_at: 1_708_345_678,
        }
    }

    fn decision(cues: &[&str]) -> TriggerDecision {
        TriggerDecision {
            invoke: true,
            reason: TriggerReason::Visualizable,
            targets: vec![VisualTarget::new("duck design").unwrap()],
            style_cues: cues.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn policy() -> CompiledPolicy {
        PolicyConfig::default().compile().unwrap()
    }

    #[tokio::test]
    async fn test_no_invoke_skips_lookup() {
        let lookup = FixedLookup::new(Ok(vec![stored(1, "duck")]));
        let outcome = build_plan(&TriggerDecision::none(), &lookup, &policy()).await;
        assert_eq!(outcome.plan, VisionPlan::none());
        assert!(outcome.warnings.is_empty());
        assert_eq!(lookup.calls(), 0);
    }

    #[tokio::test]
    async fn test_reuse_when_saved_found() {
        let lookup = FixedLookup::new(Ok(vec![stored(1, "duck"), stored(2, "duck design")]));
        let outcome = build_plan(&decision(&[]), &lookup, &policy()).await;
        assert_eq!(outcome.plan.mode, PlanMode::Reuse);
        assert_eq!(outcome.plan.references.as_ref().map(Vec::len), Some(2));
        assert!(outcome.plan.backend.is_none());
        assert_eq!(lookup.calls(), 1);
    }

    #[tokio::test]
    async fn test_reuse_truncated_to_max_candidates() {
        let p = PolicyConfig {
            max_candidates: 1,
            ..PolicyConfig::default()
        }
        .compile()
        .unwrap();
        let lookup = FixedLookup::new(Ok(vec![stored(1, "duck"), stored(2, "duck")]));
        let outcome = build_plan(&decision(&[]), &lookup, &p).await;
        let ids: Vec<u64> = outcome.plan.references.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[tokio::test]
    async fn test_reuse_declined() {
        let p = policy().with_use_saved_first(false);
        let lookup = FixedLookup::new(Ok(vec![stored(1, "duck")]));
        let outcome = build_plan(&decision(&[]), &lookup, &p).await;
        assert_eq!(outcome.plan.mode, PlanMode::Fetch);
        assert!(outcome.plan.references.is_none());
        assert_eq!(lookup.calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_default_backend() {
        let lookup = FixedLookup::new(Ok(Vec::new()));
        let p = policy();
        let outcome = build_plan(&decision(&[]), &lookup, &p).await;
        assert_eq!(outcome.plan.mode, PlanMode::Fetch);
        assert_eq!(outcome.plan.backend, Some(Backend::SimilarityModel));
        assert_eq!(outcome.plan.threshold, Some(p.thresholds.similarity_model));
        assert_eq!(outcome.plan.max_candidates, Some(p.max_candidates));
    }

    #[tokio::test]
    async fn test_style_cue_flips_backend() {
        let lookup = FixedLookup::new(Ok(Vec::new()));
        let p = policy();
        let outcome = build_plan(&decision(&["style", "retro"]), &lookup, &p).await;
        assert_eq!(outcome.plan.backend, Some(Backend::VisionLanguageModel));
        assert_eq!(outcome.plan.threshold, Some(p.thresholds.vision_language_model));
    }

    #[tokio::test]
    async fn test_style_cue_flips_from_vlm_default() {
        let p = PolicyConfig {
            backend_default: Backend::VisionLanguageModel,
            ..PolicyConfig::default()
        }
        .compile()
        .unwrap();
        let lookup = FixedLookup::new(Ok(Vec::new()));
        let outcome = build_plan(&decision(&["style"]), &lookup, &p).await;
        assert_eq!(outcome.plan.backend, Some(Backend::SimilarityModel));
    }

    #[tokio::test]
    async fn test_lookup_failure_degrades_to_fetch() {
        let lookup = FixedLookup::new(Err(LookupError::Failed("connection refused".to_string())));
        let outcome = build_plan(&decision(&[]), &lookup, &policy()).await;
        assert_eq!(outcome.plan.mode, PlanMode::Fetch);
        assert!(outcome.plan.references.is_none());
        assert_eq!(
            outcome.warnings,
            vec![PlanWarning::LookupFailed {
                message: "connection refused".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_collaborator_timeout_error() {
        let lookup = FixedLookup::new(Err(LookupError::Timeout(Duration::from_millis(750))));
        let outcome = build_plan(&decision(&[]), &lookup, &policy()).await;
        assert_eq!(outcome.plan.mode, PlanMode::Fetch);
        assert_eq!(
            outcome.warnings,
            vec![PlanWarning::LookupTimedOut { after_ms: 750 }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_lookup_times_out() {
        let p = PolicyConfig {
            lookup_timeout_ms: 50,
            ..PolicyConfig::default()
        }
        .compile()
        .unwrap();
        let outcome = build_plan(&decision(&[]), &SlowLookup, &p).await;
        assert_eq!(outcome.plan.mode, PlanMode::Fetch);
        assert_eq!(
            outcome.warnings,
            vec![PlanWarning::LookupTimedOut { after_ms: 50 }]
        );
    }

    #[tokio::test]
    async fn test_idempotent() {
        let lookup = FixedLookup::new(Ok(vec![stored(1, "duck")]));
        let p = policy();
        let d = decision(&[]);
        let a = build_plan(&d, &lookup, &p).await;
        let b = build_plan(&d, &lookup, &p).await;
        assert_eq!(a, b);
    }
}

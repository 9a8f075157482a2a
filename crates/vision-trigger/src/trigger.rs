//! Trigger detection: does this turn need vision tooling at all?

use std::collections::HashSet;

use crate::config::CompiledPolicy;
use crate::phrase::{self, PhraseExtractor};
use crate::types::{TriggerDecision, TriggerReason, VisualTarget};

/// Decide whether an utterance should invoke vision tooling.
///
/// Lexical patterns are checked first and win over allow-set matches. When no
/// pattern matches, only phrases containing a visualizable concept word are
/// kept as targets. Targets are deduplicated in order of first appearance and
/// capped at `max_targets`.
pub fn detect_trigger(
    policy: &CompiledPolicy,
    extractor: &dyn PhraseExtractor,
    utterance: &str,
) -> TriggerDecision {
    if utterance.trim().is_empty() {
        return TriggerDecision::none();
    }

    let candidates = dedup_targets(extractor.extract(utterance));

    let (reason, mut targets) = if let Some(pattern) = policy.lexical_match(utterance) {
        tracing::debug!("Lexical trigger matched pattern {}", pattern.as_str());
        (TriggerReason::Lexical, candidates)
    } else {
        let visual: Vec<VisualTarget> = candidates
            .into_iter()
            .filter(|t| t.words().any(|w| policy.is_concept(w)))
            .collect();
        if visual.is_empty() {
            tracing::debug!("No vision trigger");
            return TriggerDecision::none();
        }
        (TriggerReason::Visualizable, visual)
    };

    if targets.len() > policy.max_targets {
        tracing::debug!(
            "Truncating {} targets to the first {}",
            targets.len(),
            policy.max_targets
        );
        targets.truncate(policy.max_targets);
    }

    let style_cues = style_cues(policy, utterance);

    tracing::debug!(
        "Vision trigger ({:?}): targets={:?} cues={:?}",
        reason,
        targets,
        style_cues
    );

    TriggerDecision {
        invoke: true,
        reason,
        targets,
        style_cues,
    }
}

fn dedup_targets(phrases: Vec<String>) -> Vec<VisualTarget> {
    let mut seen = HashSet::new();
    phrases
        .iter()
        .filter_map(|p| VisualTarget::new(p))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

fn style_cues(policy: &CompiledPolicy, utterance: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    phrase::words(utterance)
        .filter(|w| policy.is_style_cue(w))
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

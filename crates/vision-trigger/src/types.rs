//! Core data types for trigger decisions, stored references, and plans.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A normalized noun phrase naming something worth visualizing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisualTarget(String);

impl VisualTarget {
    /// Normalize a raw phrase: lower-case, trim, collapse inner whitespace.
    ///
    /// Returns `None` when nothing is left after normalization.
    pub fn new(raw: &str) -> Option<Self> {
        let normalized = raw
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constituent words of the phrase.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.0.split(' ')
    }
}

impl std::fmt::Display for VisualTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a trigger decision came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    /// A configured lexical pattern matched.
    Lexical,
    /// A phrase contained an allow-set concept word.
    Visualizable,
    /// Nothing matched.
    None,
}

/// Outcome of trigger detection for one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDecision {
    pub invoke: bool,
    pub reason: TriggerReason,
    pub targets: Vec<VisualTarget>,
    /// Style-cue words found in the utterance, in order of first occurrence.
    #[serde(default)]
    pub style_cues: Vec<String>,
}

impl TriggerDecision {
    /// The negative decision.
    pub fn none() -> Self {
        Self {
            invoke: false,
            reason: TriggerReason::None,
            targets: Vec::new(),
            style_cues: Vec::new(),
        }
    }
}

/// External scoring mechanism used to rank candidate images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    SimilarityModel,
    VisionLanguageModel,
}

impl Backend {
    /// The other backend.
    pub fn alternate(self) -> Self {
        match self {
            Backend::SimilarityModel => Backend::VisionLanguageModel,
            Backend::VisionLanguageModel => Backend::SimilarityModel,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Backend::SimilarityModel => "similarity_model",
            Backend::VisionLanguageModel => "vision_language_model",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where one stored image lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceLocation {
    pub storage_key: String,
    pub url: String,
}

/// Provenance of a stored reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<Backend>,
}

/// A previously persisted set of image references saved under a label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReference {
    pub id: u64,
    pub label: String,
    pub locations: Vec<ReferenceLocation>,
    #[serde(default)]
    pub source: ReferenceSource,
    pub created_at: i64,
}

/// What the orchestrator should do this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanMode {
    Reuse,
    Fetch,
    None,
}

/// The per-turn plan handed back to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionPlan {
    pub mode: PlanMode,
    pub targets: Vec<VisualTarget>,
    /// Present only when `mode` is `Reuse`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<StoredReference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<Backend>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_candidates: Option<usize>,
}

impl VisionPlan {
    pub fn none() -> Self {
        Self {
            mode: PlanMode::None,
            targets: Vec::new(),
            references: None,
            backend: None,
            threshold: None,
            max_candidates: None,
        }
    }

    pub fn reuse(targets: Vec<VisualTarget>, references: Vec<StoredReference>) -> Self {
        Self {
            mode: PlanMode::Reuse,
            targets,
            references: Some(references),
            backend: None,
            threshold: None,
            max_candidates: None,
        }
    }

    pub fn fetch(
        targets: Vec<VisualTarget>,
        backend: Backend,
        threshold: f32,
        max_candidates: usize,
    ) -> Self {
        Self {
            mode: PlanMode::Fetch,
            targets,
            references: None,
            backend: Some(backend),
            threshold: Some(threshold),
            max_candidates: Some(max_candidates),
        }
    }
}

/// A recoverable problem encountered while planning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanWarning {
    LookupTimedOut { after_ms: u64 },
    LookupFailed { message: String },
}

impl std::fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanWarning::LookupTimedOut { after_ms } => {
                write!(f, "reference lookup timed out after {after_ms} ms")
            }
            PlanWarning::LookupFailed { message } => {
                write!(f, "reference lookup failed: {message}")
            }
        }
    }
}

/// A plan plus any warnings raised while building it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub plan: VisionPlan,
    #[serde(default)]
    pub warnings: Vec<PlanWarning>,
}

/// Errors that can occur while loading or validating a policy.
#[derive(thiserror::Error, Debug)]
pub enum PolicyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid lexical pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid allow-set entry {0:?}: entries must be single non-empty words")]
    InvalidAllowSet(String),

    #[error("Invalid style cue {0:?}: cues must be single non-empty words")]
    InvalidStyleCue(String),

    #[error("Invalid threshold for {backend}: {value} is outside [0, 1]")]
    InvalidThreshold { backend: Backend, value: f32 },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid reference: {0}")]
    InvalidReference(String),
}

/// Errors reported by a reference lookup collaborator.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("Lookup failed: {0}")]
    Failed(String),
}

/// Convenience result type.
pub type PolicyResult<T> = Result<T, PolicyError>;

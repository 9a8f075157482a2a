//! Policy configuration: the on-disk document and its validated, compiled form.
//!
//! A [`PolicyConfig`] is plain data (YAML or JSON). [`PolicyConfig::compile`]
//! checks every field and builds the lexical regexes once, producing a
//! [`CompiledPolicy`] that is consulted on every turn without further parsing.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::types::{Backend, PolicyError, PolicyResult};

/// Default lexical trigger patterns.
const DEFAULT_LEXICAL_PATTERNS: &[&str] = &[
    r"\b(show|find|get|give|search)\b.*\b(pictures?|images?|photos?|pics)\b",
    r"\breference (images?|pictures?|photos?)\b",
    r"\bvisual references?\b",
    r"\bwhat (does|do|would)\b.*\blook like\b",
    r"\bmood ?boards?\b",
    r"\binspiration (images?|pictures?|photos?)\b",
];

/// Default visualizable concept words.
const DEFAULT_ALLOWSET: &[&str] = &[
    "chair", "table", "lamp", "duck", "bracket", "vase", "mug", "cup", "bottle", "toy", "figure",
    "figurine", "robot", "car", "shoe", "helmet", "sculpture", "statue", "building", "house",
    "logo", "character", "creature", "animal", "dog", "cat", "bird", "dragon", "tree", "flower",
    "sofa", "desk", "shelf", "bowl", "plate", "knife", "sword", "ring", "necklace", "gear",
    "enclosure", "mount", "hinge", "knob", "handle",
];

/// Default style-cue words that flip the scoring backend.
const DEFAULT_STYLE_CUES: &[&str] = &[
    "style", "styled", "aesthetic", "vibe", "mood", "smooth", "minimalist", "organic",
    "retro", "futuristic", "realistic", "cartoon", "cute", "elegant",
];

const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.25;
const DEFAULT_VLM_THRESHOLD: f32 = 0.5;
const DEFAULT_MAX_CANDIDATES: usize = 8;
const DEFAULT_MAX_TARGETS: usize = 5;
const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 2_000;

/// Score thresholds per backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_model: f32,
    #[serde(default = "default_vlm_threshold")]
    pub vision_language_model: f32,
}

impl Thresholds {
    pub fn get(&self, backend: Backend) -> f32 {
        match backend {
            Backend::SimilarityModel => self.similarity_model,
            Backend::VisionLanguageModel => self.vision_language_model,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            similarity_model: DEFAULT_SIMILARITY_THRESHOLD,
            vision_language_model: DEFAULT_VLM_THRESHOLD,
        }
    }
}

fn default_similarity_threshold() -> f32 {
    DEFAULT_SIMILARITY_THRESHOLD
}

fn default_vlm_threshold() -> f32 {
    DEFAULT_VLM_THRESHOLD
}

fn default_lexical_patterns() -> Vec<String> {
    DEFAULT_LEXICAL_PATTERNS.iter().map(|s| s.to_string()).collect()
}

fn default_allowset() -> Vec<String> {
    DEFAULT_ALLOWSET.iter().map(|s| s.to_string()).collect()
}

fn default_style_cues() -> Vec<String> {
    DEFAULT_STYLE_CUES.iter().map(|s| s.to_string()).collect()
}

fn default_use_saved_first() -> bool {
    true
}

fn default_backend() -> Backend {
    Backend::SimilarityModel
}

fn default_max_candidates() -> usize {
    DEFAULT_MAX_CANDIDATES
}

fn default_max_targets() -> usize {
    DEFAULT_MAX_TARGETS
}

fn default_lookup_timeout_ms() -> u64 {
    DEFAULT_LOOKUP_TIMEOUT_MS
}

/// The policy document as written by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    #[serde(default = "default_lexical_patterns")]
    pub lexical_patterns: Vec<String>,
    #[serde(default = "default_allowset")]
    pub visual_concept_allowset: Vec<String>,
    #[serde(default = "default_use_saved_first")]
    pub use_saved_first: bool,
    #[serde(default = "default_backend")]
    pub backend_default: Backend,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default = "default_style_cues")]
    pub style_cue_words: Vec<String>,
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    /// Cap on distinct targets taken from one utterance.
    #[serde(default = "default_max_targets")]
    pub max_targets: usize,
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            lexical_patterns: default_lexical_patterns(),
            visual_concept_allowset: default_allowset(),
            use_saved_first: default_use_saved_first(),
            backend_default: default_backend(),
            thresholds: Thresholds::default(),
            style_cue_words: default_style_cues(),
            max_candidates: default_max_candidates(),
            max_targets: default_max_targets(),
            lookup_timeout_ms: default_lookup_timeout_ms(),
        }
    }
}

impl PolicyConfig {
    /// Load a policy document. `.yaml`/`.yml` files are parsed as YAML,
    /// everything else as JSON.
    pub fn from_file(path: &Path) -> PolicyResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

        if is_yaml {
            Self::from_yaml_str(&text)
        } else {
            Self::from_json_str(&text)
        }
    }

    pub fn from_yaml_str(text: &str) -> PolicyResult<Self> {
        serde_yaml::from_str(text).map_err(|e| PolicyError::Parse(e.to_string()))
    }

    pub fn from_json_str(text: &str) -> PolicyResult<Self> {
        serde_json::from_str(text).map_err(|e| PolicyError::Parse(e.to_string()))
    }

    /// Validate every field and compile the lexical patterns.
    pub fn compile(&self) -> PolicyResult<CompiledPolicy> {
        let lexical = self
            .lexical_patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| PolicyError::InvalidPattern {
                        pattern: p.clone(),
                        source,
                    })
            })
            .collect::<PolicyResult<Vec<Regex>>>()?;

        let allowset =
            normalize_word_set(&self.visual_concept_allowset, PolicyError::InvalidAllowSet)?;
        let style_cues =
            normalize_word_set(&self.style_cue_words, PolicyError::InvalidStyleCue)?;

        for backend in [Backend::SimilarityModel, Backend::VisionLanguageModel] {
            let value = self.thresholds.get(backend);
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(PolicyError::InvalidThreshold { backend, value });
            }
        }

        if self.max_candidates == 0 {
            return Err(PolicyError::InvalidConfig(
                "max_candidates must be at least 1".to_string(),
            ));
        }
        if self.max_targets == 0 {
            return Err(PolicyError::InvalidConfig(
                "max_targets must be at least 1".to_string(),
            ));
        }
        if self.lookup_timeout_ms == 0 {
            return Err(PolicyError::InvalidConfig(
                "lookup_timeout_ms must be greater than 0".to_string(),
            ));
        }

        tracing::debug!(
            "Compiled policy: {} patterns, {} concepts, {} style cues",
            lexical.len(),
            allowset.len(),
            style_cues.len()
        );

        Ok(CompiledPolicy {
            lexical,
            allowset,
            style_cues,
            use_saved_first: self.use_saved_first,
            backend_default: self.backend_default,
            thresholds: self.thresholds,
            max_candidates: self.max_candidates,
            max_targets: self.max_targets,
            lookup_timeout: Duration::from_millis(self.lookup_timeout_ms),
        })
    }
}

fn normalize_word_set(
    words: &[String],
    err: fn(String) -> PolicyError,
) -> PolicyResult<HashSet<String>> {
    words
        .iter()
        .map(|w| {
            let word = w.trim().to_lowercase();
            if word.is_empty() || word.chars().any(char::is_whitespace) {
                Err(err(w.clone()))
            } else {
                Ok(word)
            }
        })
        .collect()
}

/// A validated policy, ready to be consulted on every turn.
#[derive(Debug, Clone)]
pub struct CompiledPolicy {
    pub(crate) lexical: Vec<Regex>,
    pub(crate) allowset: HashSet<String>,
    pub(crate) style_cues: HashSet<String>,
    pub use_saved_first: bool,
    pub backend_default: Backend,
    pub thresholds: Thresholds,
    pub max_candidates: usize,
    pub max_targets: usize,
    pub lookup_timeout: Duration,
}

impl CompiledPolicy {
    /// First lexical pattern that matches, if any.
    pub fn lexical_match(&self, utterance: &str) -> Option<&Regex> {
        self.lexical.iter().find(|re| re.is_match(utterance))
    }

    /// Whether a word (or its naive singular) is a visualizable concept.
    pub fn is_concept(&self, word: &str) -> bool {
        self.allowset.contains(word) || singular_forms(word).any(|s| self.allowset.contains(s))
    }

    pub fn is_style_cue(&self, word: &str) -> bool {
        self.style_cues.contains(word)
    }

    pub fn pattern_count(&self) -> usize {
        self.lexical.len()
    }

    pub fn concept_count(&self) -> usize {
        self.allowset.len()
    }

    /// Same decision and plan parameters, with reuse switched on or off.
    pub fn with_use_saved_first(&self, use_saved_first: bool) -> Self {
        Self {
            use_saved_first,
            ..self.clone()
        }
    }
}

pub(crate) fn singular_forms(word: &str) -> impl Iterator<Item = &str> {
    [word.strip_suffix("es"), word.strip_suffix('s')]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
}

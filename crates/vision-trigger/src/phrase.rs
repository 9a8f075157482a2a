//! Candidate phrase extraction.
//!
//! Any chunker can drive trigger detection as long as it turns text into an
//! ordered list of candidate noun phrases. [`HeuristicChunker`] is the
//! built-in one: it cuts the utterance at function words, request verbs,
//! generic media nouns and evaluative adjectives, and keeps what is left.

use std::collections::HashSet;

use crate::config::singular_forms;

/// Turns text into an ordered list of candidate phrases.
pub trait PhraseExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Vec<String>;
}

impl<F> PhraseExtractor for F
where
    F: Fn(&str) -> Vec<String> + Send + Sync,
{
    fn extract(&self, text: &str) -> Vec<String> {
        self(text)
    }
}

/// Words that never belong to a visual noun phrase.
const BOUNDARY_WORDS: &[&str] = &[
    // determiners
    "a", "an", "the", "this", "that", "these", "those", "some", "any", "my", "your", "our",
    "their", "his", "her", "its", "every", "each", "another", "other", "all", "both",
    // pronouns
    "i", "me", "you", "we", "us", "they", "them", "he", "she", "it", "him", "myself",
    "something", "anything", "one", "i'm", "i'd", "i'll", "it's", "let's", "you're",
    // prepositions
    "of", "in", "on", "at", "for", "with", "without", "about", "from", "to", "into", "onto",
    "by", "like", "as", "over", "under", "near", "than", "then",
    // conjunctions and particles
    "and", "or", "but", "so", "not", "no", "yes", "just", "also", "too", "very", "really",
    "quite", "please", "maybe", "kind", "sort",
    // auxiliaries
    "is", "are", "was", "were", "be", "been", "am", "do", "does", "did", "don't", "can",
    "could", "would", "should", "will", "shall", "may", "might", "must", "have", "has", "had",
    // request verbs
    "want", "need", "show", "find", "get", "give", "make", "create", "write", "tell", "help",
    "see", "look", "let", "try", "build", "generate", "draw", "render", "search", "looking",
    "thinking", "imagine", "using", "use",
    // question words
    "what", "which", "who", "how", "where", "when", "why", "there", "here",
    // media nouns
    "picture", "pictures", "image", "images", "photo", "photos", "pic", "pics", "reference",
    "references", "example", "examples", "idea", "ideas", "model", "3d",
    // evaluative adjectives
    "cute", "nice", "cool", "good", "great", "beautiful", "pretty", "smooth", "simple",
    "little", "big", "small", "new", "awesome", "lovely",
];

/// Splits an utterance into noun-ish chunks without any language model.
///
/// Words in `concepts` (or their naive singulars) are never treated as
/// boundaries, so an allow-set word such as "model" survives chunking.
#[derive(Debug, Clone, Default)]
pub struct HeuristicChunker {
    concepts: HashSet<String>,
}

impl HeuristicChunker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A chunker that keeps the given concept words inside phrases.
    pub fn with_concepts<I, S>(concepts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            concepts: concepts
                .into_iter()
                .map(|c| c.into().trim().to_lowercase())
                .filter(|c| !c.is_empty())
                .collect(),
        }
    }

    fn is_boundary(&self, word: &str) -> bool {
        BOUNDARY_WORDS.contains(&word) && !self.is_concept(word)
    }

    fn is_concept(&self, word: &str) -> bool {
        self.concepts.contains(word)
            || singular_forms(word).any(|s| self.concepts.contains(s))
    }
}

impl PhraseExtractor for HeuristicChunker {
    fn extract(&self, text: &str) -> Vec<String> {
        let mut phrases = Vec::new();

        // Punctuation always closes a phrase.
        let is_separator =
            |c: char| !(c.is_alphanumeric() || c.is_whitespace() || c == '-' || c == '\'');
        for segment in text.split(is_separator) {
            let mut current: Vec<String> = Vec::new();

            for raw in segment.split_whitespace() {
                let word = raw.trim_matches(|c| c == '-' || c == '\'').to_lowercase();
                if word.is_empty() || self.is_boundary(&word) {
                    if !current.is_empty() {
                        phrases.push(current.join(" "));
                        current.clear();
                    }
                    continue;
                }
                current.push(word);
            }

            if !current.is_empty() {
                phrases.push(current.join(" "));
            }
        }

        phrases
    }
}

/// Split text into lower-cased words, the way the chunker sees them.
pub fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '\''))
        .map(|w| w.trim_matches(|c| c == '-' || c == '\'').to_lowercase())
        .filter(|w| !w.is_empty())
}

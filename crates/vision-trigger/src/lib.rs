//! Vision trigger policy — decides per agent turn whether to reach for
//! reference images, whether to reuse stored ones, and which backend to rank with.

pub mod config;
pub mod lookup;
pub mod phrase;
pub mod plan;
pub mod policy;
pub mod trigger;
pub mod types;

pub use config::{CompiledPolicy, PolicyConfig, Thresholds};
pub use lookup::{InMemoryReferenceStore, NewReference, ReferenceLookup};
pub use phrase::{HeuristicChunker, PhraseExtractor};
pub use plan::{build_plan, select_backend};
pub use policy::VisionTriggerPolicy;
pub use trigger::detect_trigger;
pub use types::*;

pub mod combiner;
pub mod generators;
pub mod profiler;
pub mod recommender;
pub mod similarity;
pub mod weights;

pub use generators::{CandidateGenerator, GenerationContext};
pub use profiler::{PreferenceProfile, ProfilerSettings};
pub use recommender::{ProfileReport, Recommender, RecommenderSettings};
pub use weights::AdjusterSettings;

pub mod matching;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod refine;
pub mod report;
pub mod utils;

pub use matching::engine::{match_records, match_records_parallel};
pub use matching::normalize::{normalize, normalize_rows, RawRecord};
pub use matching::weights::{NormalizedWeights, WeightVector};
pub use models::progress::{PipelineStage, ProgressRecord, ProgressStatus, SessionId};
pub use models::records::{Candidate, FieldScores, MatchResult, Record};
pub use pipeline::{PipelineInput, PipelineOutcome, PipelineOutput, PipelineRunner};
pub use progress::poller::{ProgressEvent, ProgressPoller};
pub use progress::tracker::ProgressTracker;
pub use refine::ranker::RankingCapability;
pub use refine::refiner::{RefineProgress, RefineSummary, Refiner};

pub mod analysis;
pub mod cache;
pub mod dirty;
pub mod id;
pub mod model;

pub use analysis::{AnalysisError, AnalysisResult, parse_analysis};
pub use cache::{Clock, ManualClock, PromptCache, SystemClock, TtlCache};
pub use dirty::{DirtyMemo, DirtyReport, compute_dirty};
pub use id::ElementId;
pub use model::*;

pub mod jobs;
pub mod pipeline;
pub mod prompts;

pub use jobs::{InMemoryJobStore, JobRecord, JobStatus, JobStore, JobTracker, JOB_RETENTION_SECS};
pub use pipeline::{
    AnalysisPipeline, AnalysisResult, StageTimings, FILTERED_ROUTE_COUNT, MAX_UNFILTERED_ROUTES,
};

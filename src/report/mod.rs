pub mod types;

pub use types::{
    AnalysisJob, AnalysisReport, Evidence, InfluenceChain, JobId, JobStatus, JobStatusResponse,
    PriceDirection, StockPriceQuote, StockPriceResponse, SubmitJobResponse,
    UNLINKED_POLICY_LABEL,
};

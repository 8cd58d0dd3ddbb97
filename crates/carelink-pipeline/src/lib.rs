//! # Carelink Pipeline
//!
//! 报告摄取与AI标注流水线的协调核心。

pub mod coordinator;

pub use coordinator::{
    AnalysisFailure, AnalysisOutcome, AnalysisStage, AnalyzeRequest, IngestOutcome, IngestPolicy,
    ReportCoordinator, UploadRequest,
};

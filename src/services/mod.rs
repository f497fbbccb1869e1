//! Service layer for brandscope.
//!
//! Each pipeline stage lives in its own module; [`pipeline`] runs them in
//! order. Services carry no UI concerns and report progress through events.

pub mod acquire;
pub mod count;
pub mod delivery;
pub mod fuzzy;
pub mod pipeline;
pub mod report;
pub mod stats;
pub mod visual;
pub mod youtube;

pub use acquire::{AcquireError, AcquireRequest, AcquireSummary, FrameTextProducer, YoutubeOcrProducer};
pub use count::{count_brands, BrandCount};
pub use delivery::{DeliveryError, OutboxDelivery, ReportDelivery, SmtpDelivery, REPORT_SUBJECT};
pub use pipeline::{
    Pipeline, PipelineError, PipelineEvent, PipelineOutcome, PipelineRequest, Stage,
};
pub use report::{compile_report, ReportError, ReportOptions};
pub use stats::{BrandStat, RunStatistics};
pub use visual::{generate_charts, ChartError, ChartKind, ChartOptions};

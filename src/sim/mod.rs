/// Scenario orchestrator.
pub mod engine;
/// Intra-window demand redistribution.
pub mod flexibility;
pub mod metrics;
pub mod results;

pub use engine::simulate;
pub use flexibility::{FlexOutcome, FlexibilityWindow};
pub use metrics::{AggregatedMetrics, summarize};
pub use results::SimResults;

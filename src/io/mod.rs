/// CSV export of simulation curves and metrics.
pub mod export;

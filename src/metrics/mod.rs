pub mod tracker;

pub use tracker::{NetworkMetrics, NetworkTracker};

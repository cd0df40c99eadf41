//! Pulse/time conversion for a chart's tempo schedule.

pub mod cache;

pub use cache::{TimingCache, TimingSegment};

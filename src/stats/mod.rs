//! Relay statistics

pub mod metrics;

pub use metrics::{BrokerStats, BrokerStatsSnapshot};

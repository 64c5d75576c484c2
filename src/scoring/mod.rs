pub mod aggregate;
pub mod metrics;

pub use aggregate::*;
pub use metrics::*;

pub mod aggregator;
pub mod builder;
pub mod export;
pub mod report;

pub use aggregator::*;
pub use builder::*;
pub use export::*;
pub use report::*;

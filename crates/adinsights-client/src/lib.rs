pub mod client;
pub mod resolver;
#[cfg(any(test, feature = "test-util"))]
pub mod stub;

pub use client::*;
pub use resolver::*;
#[cfg(any(test, feature = "test-util"))]
pub use stub::StubUpstream;

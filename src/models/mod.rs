pub mod example;
pub mod extraction;
pub mod program;
pub mod transcript;

pub use example::*;
pub use extraction::*;
pub use program::*;
pub use transcript::*;

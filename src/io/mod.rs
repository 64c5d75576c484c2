pub mod artifact;
pub mod dataset;
pub mod input;

pub use artifact::*;
pub use dataset::*;
pub use input::*;

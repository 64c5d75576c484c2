pub mod client;
#[cfg(test)]
pub mod fake;
pub mod invoker;
pub mod prompts;
pub mod validation;

pub use client::*;
pub use invoker::*;
pub use prompts::*;
pub use validation::*;

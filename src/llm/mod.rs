pub mod client;
pub mod prompts;
pub mod sse;
pub mod types;

pub use client::*;
pub use prompts::build_prompt;
pub use types::*;

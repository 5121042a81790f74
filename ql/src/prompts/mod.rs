//! Prompt Templates
//!
//! Instructions sent with each reasoning call, stored as `.pmt` files.
//!
//! Loading chain:
//! 1. `<prompts_dir>/{name}.pmt` (configured override)
//! 2. Embedded fallback in code

pub mod embedded;
mod loader;

pub use loader::PromptSet;

// LLM abstraction layer

pub mod bridge;
pub mod google;
pub mod provider;

pub use bridge::{ask_about_file, infer_mime_type};
pub use google::GeminiAdapter;
pub use provider::*;

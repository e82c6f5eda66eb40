//! PRD Council runtime
//!
//! Wires the debate engine in `prd-coordination` to real LLM endpoints:
//! - [`config`]: layered configuration (defaults, TOML, environment, flags)
//! - [`backend`]: OpenAI-compatible and Anthropic advisor backends
//! - [`commands`]: the handlers behind the `prd-council` binary

pub mod backend;
pub mod commands;
pub mod config;

pub use backend::{build_backend, AnthropicBackend, ChatCompletionsBackend};
pub use commands::{Council, OutputFormat};
pub use config::{ConfigOverrides, CouncilConfig, Provider};

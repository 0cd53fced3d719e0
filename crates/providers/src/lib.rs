//! Model backend implementations for grantscout.
//!
//! Currently one backend: Anthropic's Messages API, with prompt-cache
//! boundary markers on the system prompt and the final tool schema.

pub mod anthropic;

pub use anthropic::AnthropicClient;

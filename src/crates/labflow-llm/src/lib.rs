//! Remote generation backend for labflow agents.
//!
//! This crate implements the [`ChatModel`](labflow_core::ChatModel) trait from
//! `labflow-core` for OpenAI-compatible chat completion endpoints. Agents pick
//! a backend per capability tier; each tier is one [`OpenAiClient`] with its
//! own model and temperature.
//!
//! # Example
//!
//! ```rust,ignore
//! use labflow_llm::{OpenAiClient, RemoteLlmConfig, OPENAI_BASE_URL};
//! use labflow_core::{ChatModel, ChatRequest, Message};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RemoteLlmConfig::from_env("OPENAI_API_KEY", OPENAI_BASE_URL, "gpt-4o")?
//!         .with_temperature(0.0);
//!     let client = OpenAiClient::new(config)?;
//!
//!     let response = client.chat(ChatRequest::new(vec![Message::human("What is Rust?")])).await?;
//!     println!("Response: {}", response.text());
//!     Ok(())
//! }
//! ```
//!
//! # Errors
//!
//! HTTP failures are classified into [`LlmError`] variants (authentication,
//! rate limit, provider error) and reported to the engine as
//! [`GraphError::Backend`](labflow_core::GraphError::Backend) tagged with the
//! model name.

pub mod config;
pub mod error;
pub mod openai;

pub use config::{RemoteLlmConfig, OPENAI_BASE_URL};
pub use error::{LlmError, Result};
pub use openai::OpenAiClient;

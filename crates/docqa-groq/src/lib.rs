//! Groq integration for docqa
//!
//! This crate provides the Groq implementation of the LLMProvider trait.

mod client;
mod config;


pub use client::GroqClient;
pub use config::{GroqConfig, DEFAULT_API_URL, DEFAULT_MODEL};

// Re-export core types for convenience
pub use docqa_core::{Error, LLMProvider, Result};

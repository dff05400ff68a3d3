//! # Finance Chat Relay
//!
//! A small backend that answers a user's question about their own finances.
//! The caller sends accounts, transactions and goals with every request; the
//! relay renders them into a fixed prompt, forwards it to Google Gemini and
//! returns the answer either whole or as a stream of server-sent events.
//!
//! ## Layout
//!
//! - [`ingestion`] validates the request body and normalizes wire dates
//! - [`llm`] holds the prompt template, the [`GenerativeModel`] seam and the Gemini client
//! - [`analysis`] is the relay: one-shot and streaming analysis on top of a model
//! - [`server`] exposes the three HTTP routes
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use finance_chat_relay::*;
//!
//! let config = Config::from_env()?;
//! let analyst = FinancialAnalyst::new(Arc::new(GeminiClient::from_config(&config)));
//! let answer = analyst.analyze(&request).await?;
//! println!("{}", answer.response);
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod llm;
pub mod schema;
pub mod server;
pub mod utils;

pub use analysis::{ChunkStream, FinancialAnalyst};
pub use config::Config;
pub use error::{AnalysisError, Result};
pub use ingestion::{parse_analysis_request, RawAnalysisPayload};
pub use llm::{GeminiClient, GenerativeModel, UnitStream};
pub use schema::*;
pub use server::{router, serve};

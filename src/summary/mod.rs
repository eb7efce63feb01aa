//! Natural-language summary of low-score comments.
//!
//! This module provides the streaming chat client and the accumulation
//! of its incremental output.

pub mod client;
pub mod stream;

pub use client::{summarize_comments, SUMMARY_HEADING};

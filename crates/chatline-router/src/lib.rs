// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message analysis and routing for the Chatline pipeline.
//!
//! This crate provides:
//! - [`Preprocessor`]: validation and keyword analysis of raw text
//! - [`QuickReplyTable`]: canned replies that bypass every model call
//! - [`Classifier`]: code/general categorization with a bounded backend fallback
//! - [`ParameterOptimizer`]: route tier to backend and sampling parameters

pub mod classifier;
pub mod planner;
pub mod preprocess;
pub mod quick_reply;

pub use classifier::{Classifier, classification_prompt, parse_label};
pub use planner::{ParameterOptimizer, route_tier};
pub use preprocess::{KeywordSet, Preprocessor};
pub use quick_reply::QuickReplyTable;

// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation history storage for Chatline.
//!
//! The history store is an external collaborator of the pipeline. This crate
//! ships the in-process implementation used by the server and tests.

pub mod memory;

pub use memory::{DEFAULT_MAX_TURNS, MemoryHistoryStore};

// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response cache for the Chatline pipeline.
//!
//! A process-wide, bounded key→response store with strict FIFO eviction,
//! plus the stable key derivation that decides when two requests are the same.

pub mod cache;
pub mod key;

pub use cache::{CacheStats, ResponseCache};
pub use key::CacheKey;

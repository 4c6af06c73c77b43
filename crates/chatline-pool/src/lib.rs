// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection pool for model backends.
//!
//! A fixed number of handles is created up front. Requests lease one at a
//! time through [`PoolLease`], which returns the slot on drop on every path.

pub mod pool;

pub use pool::{ConnectionPool, Connector, PoolLease, PoolStats};

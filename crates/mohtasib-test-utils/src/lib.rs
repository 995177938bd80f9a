// SPDX-FileCopyrightText: 2026 Mohtasib Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Mohtasib integration tests.
//!
//! Provides store doubles with fault injection and call accounting, plus
//! record fixtures with inline payloads of a chosen size.

pub mod fixtures;
pub mod mock_kv;
pub mod mock_large_object;

pub use mock_kv::MockKvStore;
pub use mock_large_object::MemoryLargeObjectStore;

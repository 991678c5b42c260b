// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Roomlink: credential lifecycle for the Chatwire bearer-token API.
//!
//! The [`credential`] module is the core: acquisition strategies, a cached
//! synchronous token read for concurrent callers, proactive renewal ahead of
//! expiry, and restricted-permission persistence across restarts.

pub mod command;
pub mod config;
pub mod credential;
pub mod test_support;

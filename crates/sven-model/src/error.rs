// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use thiserror::Error;

/// Errors raised while constructing a [`crate::ModelProvider`] from config.
/// Wrapped into `anyhow::Error` at the `from_config` boundary so callers
/// keep using `anyhow::Result`; this type exists so the failure reasons are
/// named and testable rather than ad-hoc formatted strings.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown model provider: {provider:?}\nRun `sven list-providers` for a full list, or check your config.\nKnown providers: {known}")]
    UnknownProvider { provider: String, known: String },

    #[error("{provider} provider requires base_url in config")]
    MissingBaseUrl { provider: &'static str },
}

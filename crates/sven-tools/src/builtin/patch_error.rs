// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use thiserror::Error;

/// Errors raised while parsing or applying a `apply_patch`-format patch.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("'*** Begin Patch' not found")]
    BeginMarkerNotFound,

    #[error("'*** End Patch' not found")]
    EndMarkerNotFound,

    #[error("'*** End Patch' appears before '*** Begin Patch'")]
    EndBeforeBegin,

    #[error("expected '{prefix}'")]
    MissingFileHeader { prefix: &'static str },

    #[error("cannot read {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("hunk failed for {path}: {source}")]
    HunkFailed {
        path: String,
        #[source]
        source: Box<PatchError>,
    },

    #[error("could not find hunk context in file")]
    HunkContextNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Errors surfaced to the host application for API misuse.
///
/// Cleanup paths (dropping an already finished span, an orphaned
/// resource key) never produce these; they are logged through the
/// internal logger instead so that defensive host code cannot crash.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error("the SDK has not been initialized yet")]
    NotInitialized,

    #[error("the SDK is already initialized")]
    AlreadyInitialized,

    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[error("resource key `{0}` is already being tracked")]
    DuplicateKey(String),

    #[error("resource key `{0}` is not being tracked")]
    UnknownKey(String),
}

pub type Result<T> = std::result::Result<T, Error>;

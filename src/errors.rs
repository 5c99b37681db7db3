// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The failure modes of a movie run.  None of them are recovered
//! locally; every one of them ends the run.

use failure::Fail;
use std::process::ExitStatus;

/// Everything that can stop a render.
#[derive(Debug, Fail)]
pub enum MovieError {
    /// An option was out of range, caught before any work started.
    #[fail(display = "invalid configuration: {}", _0)]
    InvalidConfiguration(String),

    /// A worker process or a tile thread could not be created.
    #[fail(display = "resource exhaustion: {}", _0)]
    ResourceExhaustion(String),

    /// The ordering barrier could not be built, or a baton could not
    /// be passed along it.
    #[fail(display = "ordering barrier failure: {}", _0)]
    SynchronizationSetupFailure(String),

    /// A worker process exited without success.
    #[fail(display = "worker process {} failed: {}", process, status)]
    WorkerFailed {
        /// Index of the failing process.
        process: usize,
        /// What the operating system reported.
        status: ExitStatus,
    },

    /// The image encoder refused a frame.
    #[fail(display = "could not encode frame: {}", _0)]
    Encode(#[cause] image::ImageError),

    /// Filesystem trouble writing a frame.
    #[fail(display = "i/o error: {}", _0)]
    Io(#[cause] std::io::Error),
}

impl From<std::io::Error> for MovieError {
    fn from(err: std::io::Error) -> Self {
        MovieError::Io(err)
    }
}

impl From<image::ImageError> for MovieError {
    fn from(err: image::ImageError) -> Self {
        MovieError::Encode(err)
    }
}

/// Shorthand used throughout the crate.
pub type Result<T> = std::result::Result<T, MovieError>;

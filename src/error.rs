// nettick - Tick-driven TCP application host over a pluggable wire protocol
// Copyright (C) 2026  nettick contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use thiserror::Error;

/// Fatal failures that abort startup before the tick loop is entered.
/// These never leave partial lifecycle events behind, since `start()`
/// never reached its loop.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid script type: {0}")]
    InvalidScriptType(String),
}

pub type HostResult<T> = std::result::Result<T, HostError>;

/// Failures raised by a [`crate::protocol::MessageSerializer`] while framing
/// or parsing a single message. These are recoverable per-frame errors;
/// the application surfaces them as `BadRequest` events rather than
/// propagating them.
#[derive(Debug, Error)]
pub enum SerializerError {
    #[error("buffer too short to contain a frame header")]
    Incomplete,

    #[error("malformed frame: {0}")]
    Malformed(String),
}

/// Failures raised when the script loader is asked to construct a script
/// whose type does not satisfy the marker contract.
#[derive(Debug, Error)]
pub enum ScriptLoadError {
    #[error("script construction failed: {0}")]
    ConstructionFailed(String),
}

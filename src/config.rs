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

use serde::Deserialize;

use crate::error::{HostError, HostResult};

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(rename(deserialize = "General"))]
    pub general: General,

    #[serde(rename(deserialize = "Pools"))]
    #[serde(default)]
    pub pools: Pools,
}

#[derive(Deserialize, Debug)]
pub struct General {
    pub bind_address: String,

    /// OS-level accept backlog hint passed through to the listener.
    #[serde(default = "default_backlog")]
    pub backlog: u32,

    /// Seconds a peer may stay idle (no inbound frame) before the host
    /// times it out.
    #[serde(default = "default_peer_grace_period_secs")]
    pub peer_grace_period_secs: u64,
}

/// Pre-warm sizes for the request/response/notification pools, so the
/// first handful of ticks under load don't pay allocation cost. All
/// optional; an omitted or zero value just means "grow on demand".
#[derive(Deserialize, Debug, Default)]
pub struct Pools {
    #[serde(default)]
    pub requests: usize,

    #[serde(default)]
    pub responses: usize,

    #[serde(default)]
    pub notifications: usize,
}

fn default_backlog() -> u32 {
    1024
}

fn default_peer_grace_period_secs() -> u64 {
    60
}

impl Config {
    pub fn load(path: &str) -> HostResult<Self> {
        let contents = std::fs::read(path).map_err(HostError::Io)?;
        toml::from_slice(&contents).map_err(|e| HostError::Config(e.to_string()))
    }
}

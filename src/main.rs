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

#[macro_use]
extern crate log;

use std::env::var;
use std::time::Duration;

use nettick::{BytesSerializer, Config, HostBuilder, Request, Response, StatusCode};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config_loc = var("NETTICK_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let config = Config::load(&config_loc)?;

    let addr = config.general.bind_address.parse()?;
    let backlog = config.general.backlog;
    let peer_grace_period = Duration::from_secs(config.general.peer_grace_period_secs);

    let mut application = HostBuilder::new(BytesSerializer)
        .pools(config.pools)
        .peer_grace_period(peer_grace_period)
        .route(
            |_: &Request<BytesSerializer>| true,
            |req: &Request<BytesSerializer>, resp: &mut Response<BytesSerializer>| {
                resp.message = req.message.clone();
                resp.status = StatusCode::Ok;
                resp.contains_reply = true;
                Ok(())
            },
        )
        .build();

    info!("nettick starting (config = {})", config_loc);

    application.start(addr, backlog).await?;

    Ok(())
}

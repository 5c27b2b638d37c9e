/*
 * SPDX-FileCopyrightText: Copyright (c) 2023 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: MIT
 *
 * Permission is hereby granted, free of charge, to any person obtaining a
 * copy of this software and associated documentation files (the "Software"),
 * to deal in the Software without restriction, including without limitation
 * the rights to use, copy, modify, merge, publish, distribute, sublicense,
 * and/or sell copies of the Software, and to permit persons to whom the
 * Software is furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in
 * all copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL
 * THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
 * FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
 * DEALINGS IN THE SOFTWARE.
 */

/* racadm test/example client
 * Also useful for poking at an iDRAC by hand.
 *
 * USAGE: ./client -H 10.153.145.103 -U root -P ThePassword -c get_os
 * -H: IP address or hostname of the iDRAC. SSH on port 22.
 * -C: JSON config file, required for firmware updates (transfer share).
 * Run with no params for help.
 * Run with `-v` for more output.
 */

use std::fs;

use anyhow::{anyhow, Context};
use libracadm::{Config, FirmwareKind, Idrac, Lifecycle, SshConnector, Target, TransferEndpoint};
use tracing::{error, info};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt::Layer;
use tracing_subscriber::prelude::*;

fn main() -> Result<(), anyhow::Error> {
    let args: Vec<String> = std::env::args().collect();
    let mut opts = getopts::Options::new();

    opts.optflag("h", "help", "Print this help");
    opts.optflag("v", "verbose", "Log at DEBUG level. Default is INFO");
    opts.optopt(
        "H",
        "hostname",
        "Required. Hostname or IP address of the iDRAC",
        "HOST",
    );
    opts.optopt("U", "username", "iDRAC username. Default root", "USER");
    opts.optopt("P", "password", "iDRAC password", "PASS");
    opts.optopt("C", "config", "JSON config file", "FILE");
    opts.optopt(
        "a",
        "arg",
        "Argument to the command: firmware kind, power operation or new password",
        "ARG",
    );
    opts.optopt(
        "c",
        "cmd",
        "Command to run:
                get_os
                get_firmware -a bios|idrac
                power -a start|stop|reboot|hardreset|status
                update_firmware -a bios|idrac
                get_disks
                change_password -a NEW_PASSWORD",
        "CMD",
    );

    let args_given = opts.parse(&args[1..])?;
    let Some(host) = args_given.opt_str("H") else {
        eprintln!(
            "{}",
            opts.usage("client -H idrac_ip -U idrac_user -P idrac_pass -c cmd")
        );
        return Ok(());
    };
    if args_given.opt_present("h") {
        eprintln!(
            "{}",
            opts.usage("client -H idrac_ip -U idrac_user -P idrac_pass -c cmd")
        );
        return Ok(());
    }

    let log_level = if args_given.opt_present("v") {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let env_filter = EnvFilter::from_default_env()
        .add_directive(log_level.into())
        .add_directive("ssh2=warn".parse()?);
    tracing_subscriber::registry()
        .with(Layer::default().compact())
        .with(env_filter)
        .init();

    let user = args_given.opt_str("U").unwrap_or_else(|| "root".to_string());
    let password = args_given.opt_str("P").unwrap_or_default();
    let target = Target::new(&host, &user, &password);

    let config = match args_given.opt_str("C") {
        Some(path) => {
            let raw = fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            serde_json::from_str::<Config>(&raw).with_context(|| format!("parsing {path}"))?
        }
        // Fine for everything except firmware updates
        None => Config::new(TransferEndpoint {
            server: String::new(),
            folder: String::new(),
            user: String::new(),
            password: String::new(),
        }),
    };
    let idrac = Idrac::new(Box::new(SshConnector::default()), config);

    let Some(cmd) = args_given.opt_str("c") else {
        return Ok(());
    };
    let arg = args_given.opt_str("a");
    let require_arg = || arg.clone().ok_or_else(|| anyhow!("{cmd} needs -a"));
    match cmd.as_str() {
        "get_os" => {
            info!("{}", idrac.get_running_os(&target)?);
        }
        "get_firmware" => {
            let kind: FirmwareKind = require_arg()?.parse()?;
            info!("{}", idrac.get_firmware(&target, kind)?);
        }
        "power" => {
            info!("{}", idrac.power_named(&target, &require_arg()?)?);
        }
        "update_firmware" => {
            if idrac.config().transfer.server.is_empty() {
                return Err(anyhow!("update_firmware needs a transfer share, pass -C"));
            }
            let report = idrac.update_firmware_named(&target, &require_arg()?)?;
            info!("{report}");
        }
        "get_disks" => {
            info!("{}", idrac.get_disks(&target)?);
        }
        "change_password" => {
            let updated = idrac.change_password(&target, &require_arg()?)?;
            info!("Password for {} changed", updated.name);
        }
        _ => {
            error!("Unsupported command specified {cmd}");
        }
    }

    Ok(())
}

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
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::parse::{self, Field};
use crate::RacadmError;

pub const SYSINFO_COMMAND: &str = "getsysinfo";

/// Values read from the `getsysinfo` dump. Labels are padded to the column
/// racadm aligns its `=` signs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SysInfoField {
    BiosVersion,
    FirmwareVersion,
    OsName,
}

const BIOS_VERSION: Field = Field::line("System BIOS Version     = ");
const FIRMWARE_VERSION: Field = Field::line("Firmware Version        = ");
const OS_NAME: Field = Field::line("OS Name                 = ");

impl SysInfoField {
    pub fn field(&self) -> &'static Field {
        match self {
            SysInfoField::BiosVersion => &BIOS_VERSION,
            SysInfoField::FirmwareVersion => &FIRMWARE_VERSION,
            SysInfoField::OsName => &OS_NAME,
        }
    }

    pub fn parse(&self, dump: &str) -> Result<String, RacadmError> {
        parse::extract_owned(dump, self.field())
    }
}

/// `racadm serveraction` subcommands
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PowerAction {
    PowerUp,
    PowerDown,
    PowerCycle,
    HardReset,
    PowerStatus,
}

impl PowerAction {
    pub fn command(&self) -> String {
        format!("racadm serveraction {}", self.subcommand())
    }

    fn subcommand(&self) -> &'static str {
        match self {
            PowerAction::PowerUp => "powerup",
            PowerAction::PowerDown => "powerdown",
            PowerAction::PowerCycle => "powercycle",
            PowerAction::HardReset => "hardreset",
            PowerAction::PowerStatus => "powerstatus",
        }
    }

    // racadm prints a "Server power operation successful" style line; anything
    // else is handed back whole so the operator sees the raw error.
    pub fn summarize(reply: &str) -> String {
        reply
            .lines()
            .filter(|l| l.contains("Server "))
            .last()
            .map(|l| l.trim().to_string())
            .unwrap_or_else(|| reply.to_string())
    }
}

impl fmt::Display for PowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.subcommand())
    }
}

/// Accepts the operator words (start, stop, reboot, hardreset, status) as well
/// as the racadm subcommand names.
impl FromStr for PowerAction {
    type Err = RacadmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "start" | "powerup" => Ok(PowerAction::PowerUp),
            "stop" | "powerdown" => Ok(PowerAction::PowerDown),
            "reboot" | "powercycle" => Ok(PowerAction::PowerCycle),
            "hardreset" => Ok(PowerAction::HardReset),
            "status" | "powerstatus" => Ok(PowerAction::PowerStatus),
            _ => Err(RacadmError::InvalidInput(s.to_string())),
        }
    }
}

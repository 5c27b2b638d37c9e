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
use std::{cmp::Ordering, fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::model::system::SysInfoField;
use crate::version::Version;
use crate::RacadmError;

/// Switches the Lifecycle Controller on so it accepts `racadm update`.
pub const ENABLE_UPDATE_MODE_COMMAND: &str =
    "racadm set lifecyclecontroller.lcattributes.lifecyclecontrollerstate 1";

/// Firmware that can be read and flashed through racadm.
#[derive(Debug, clap::ValueEnum, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FirmwareKind {
    Bios,
    /// iDRAC together with the Lifecycle Controller
    Controller,
}

impl FirmwareKind {
    pub fn sysinfo_field(&self) -> SysInfoField {
        match self {
            FirmwareKind::Bios => SysInfoField::BiosVersion,
            FirmwareKind::Controller => SysInfoField::FirmwareVersion,
        }
    }
}

impl fmt::Display for FirmwareKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FirmwareKind::Bios => f.write_str("BIOS"),
            FirmwareKind::Controller => f.write_str("iDRAC"),
        }
    }
}

impl FromStr for FirmwareKind {
    type Err = RacadmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bios" => Ok(FirmwareKind::Bios),
            "idrac" | "lifecycle" | "controller" => Ok(FirmwareKind::Controller),
            _ => Err(RacadmError::InvalidInput(s.to_string())),
        }
    }
}

/// Image file names on the transfer share, one per firmware kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirmwareImages {
    pub bios: String,
    pub controller: String,
}

impl Default for FirmwareImages {
    fn default() -> Self {
        FirmwareImages {
            bios: "bios.EXE".to_string(),
            controller: "idrac.EXE".to_string(),
        }
    }
}

impl FirmwareImages {
    pub fn file_name(&self, kind: FirmwareKind) -> &str {
        match kind {
            FirmwareKind::Bios => &self.bios,
            FirmwareKind::Controller => &self.controller,
        }
    }
}

/// The CIFS share the controller downloads images from. Only passed through to `racadm update`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEndpoint {
    pub server: String,
    pub folder: String,
    pub user: String,
    pub password: String,
}

impl TransferEndpoint {
    pub fn path(&self) -> String {
        format!("//{}/{}", self.server, self.folder)
    }

    pub fn update_command(&self, image_file_name: &str) -> String {
        format!(
            "racadm update -f {} -u {} -p {} -l {}",
            image_file_name,
            self.user,
            self.password,
            self.path()
        )
    }
}

impl fmt::Debug for TransferEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferEndpoint")
            .field("server", &self.server)
            .field("folder", &self.folder)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Cadence and ceilings of the firmware update state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdatePolicy {
    /// Between job queue checks while the update runs
    #[serde(with = "crate::model::secs")]
    pub poll_delay: Duration,
    /// Upper bound on the main poll loop. None polls until the job finishes, however long the
    /// flash takes.
    #[serde(with = "crate::model::secs::option")]
    pub max_poll_duration: Option<Duration>,
    /// After a reboot, or after the controller dropped the connection, before reconnecting
    #[serde(with = "crate::model::secs")]
    pub settle_delay: Duration,
    pub reconnect_attempts: u32,
    #[serde(with = "crate::model::secs")]
    pub reconnect_delay: Duration,
    /// Job checks after reconnecting, BIOS only
    pub verify_poll_attempts: u32,
    #[serde(with = "crate::model::secs")]
    pub verify_poll_delay: Duration,
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        UpdatePolicy {
            poll_delay: Duration::from_secs(5),
            max_poll_duration: None,
            settle_delay: Duration::from_secs(30),
            reconnect_attempts: 10,
            reconnect_delay: Duration::from_secs(20),
            verify_poll_attempts: 100,
            verify_poll_delay: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareUpdateRequest {
    pub kind: FirmwareKind,
    pub image_file_name: String,
    pub version_before_update: Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateOutcome {
    /// The new version is higher than the old one
    Upgraded,
    /// Nothing changed, which may or may not have been intended
    Unchanged,
    /// The version went down. Reported for a human to judge.
    Changed,
}

impl UpdateOutcome {
    pub fn classify(before: &Version, after: &Version) -> UpdateOutcome {
        match after.cmp(before) {
            Ordering::Greater => UpdateOutcome::Upgraded,
            Ordering::Equal => UpdateOutcome::Unchanged,
            Ordering::Less => UpdateOutcome::Changed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub kind: FirmwareKind,
    pub job_id: String,
    pub before: Version,
    pub after: Version,
    pub outcome: UpdateOutcome,
}

impl fmt::Display for UpdateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            UpdateOutcome::Upgraded => write!(
                f,
                "Successfully updated the {} Firmware to version: {}",
                self.kind, self.after
            ),
            UpdateOutcome::Unchanged => write!(
                f,
                "Version stayed the same({}), please check the logs if it wasn't intended",
                self.after
            ),
            UpdateOutcome::Changed => write!(f, "New Version is: {}", self.after),
        }
    }
}

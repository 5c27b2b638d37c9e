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
//! Dell iDRAC lifecycle operations over the racadm SSH console.
//!
//! There is no structured API here: every operation is a run of racadm
//! commands whose text replies are matched against a prompt and picked apart
//! by label. See [`Lifecycle`] for what is supported and [`Idrac`] for the
//! implementation.
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

pub mod console;
mod dell;
mod error;
pub mod job;
pub mod model;
pub mod network;
pub mod parse;
pub mod update;
pub mod version;

pub use console::{Session, SessionState, Sleeper, ThreadSleeper};
pub use dell::Idrac;
pub use error::RacadmError;
pub use model::{
    DiskInventory, FirmwareImages, FirmwareKind, JobRecord, JobStatus, PhysicalDisk,
    PowerAction, TransferEndpoint, UpdateOutcome, UpdatePolicy, UpdateReport, VirtualDisk,
};
pub use network::{Connector, ConnectorBuilder, Console, SshConnector, Target, MANAGEMENT_PORT};
pub use version::Version;

/// Lifecycle operations on one management controller. Every call opens its own console session
/// and closes it before returning.
pub trait Lifecycle {
    /// Name of the operating system the host reports
    fn get_running_os(&self, target: &Target) -> Result<String, RacadmError>;

    /// Currently installed version of a firmware
    fn get_firmware(&self, target: &Target, kind: FirmwareKind) -> Result<Version, RacadmError>;

    /// Run a `racadm serveraction`. Returns the controller's one line summary.
    fn power(&self, target: &Target, action: PowerAction) -> Result<String, RacadmError>;

    /// Flash firmware from the configured transfer share and check the version afterwards.
    /// Reboots the host if the controller schedules the update for the next boot.
    fn update_firmware(
        &self,
        target: &Target,
        kind: FirmwareKind,
    ) -> Result<UpdateReport, RacadmError>;

    /// Virtual and physical disks behind the RAID controller
    fn get_disks(&self, target: &Target) -> Result<DiskInventory, RacadmError>;

    /// Change the password of the iDRAC user in slot 2 (root).
    /// Returns the target with the new password; the one passed in is stale afterwards.
    fn change_password(&self, target: &Target, new_password: &str)
        -> Result<Target, RacadmError>;
}

/// Human readable progress messages for whoever started the operation.
pub trait Reporter {
    fn report(&self, message: &str);
}

/// Sends progress messages to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, message: &str) {
        info!("{message}");
    }
}

impl<F: Fn(&str)> Reporter for F {
    fn report(&self, message: &str) {
        self(message)
    }
}

fn default_poll_interval_secs() -> u64 {
    console::DEFAULT_POLL_INTERVAL.as_secs()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where the controller fetches firmware images from
    pub transfer: TransferEndpoint,
    #[serde(default)]
    pub images: FirmwareImages,
    #[serde(default)]
    pub update: UpdatePolicy,
    /// How often a waiting command polls the console for output
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Config {
    pub fn new(transfer: TransferEndpoint) -> Self {
        Config {
            transfer,
            images: FirmwareImages::default(),
            update: UpdatePolicy::default(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

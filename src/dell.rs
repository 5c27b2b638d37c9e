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
use std::sync::Arc;

use tracing::{error, info};

use crate::{
    console::{prompt, redact, Session, Sleeper, ThreadSleeper, MASK},
    model::{
        storage::{self, PHYSICAL_DISKS_COMMAND, VIRTUAL_DISKS_COMMAND},
        system::{SysInfoField, SYSINFO_COMMAND},
    },
    network::{Connector, Target},
    parse,
    update::FirmwareUpdater,
    Config, DiskInventory, FirmwareKind, Lifecycle, LogReporter, PowerAction, RacadmError,
    Reporter, UpdateReport, Version,
};

const ROOT_USER_SLOT: u32 = 2;

/// Lifecycle operations on a Dell iDRAC through racadm.
pub struct Idrac {
    connector: Box<dyn Connector>,
    config: Config,
    reporter: Box<dyn Reporter>,
    sleeper: Arc<dyn Sleeper>,
}

impl Idrac {
    pub fn new(connector: Box<dyn Connector>, config: Config) -> Idrac {
        Idrac {
            connector,
            config,
            reporter: Box::new(LogReporter),
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    pub fn with_reporter(mut self, reporter: Box<dyn Reporter>) -> Idrac {
        self.reporter = reporter;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Idrac {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `update_firmware` for a kind given by name ("bios", "idrac", "lifecycle").
    /// An unknown name is rejected before anything is sent to the controller.
    pub fn update_firmware_named(
        &self,
        target: &Target,
        kind: &str,
    ) -> Result<UpdateReport, RacadmError> {
        let kind = kind
            .parse::<FirmwareKind>()
            .inspect_err(|e| self.report_failure(target, e))?;
        self.update_firmware(target, kind)
    }

    /// `power` for an operator word ("start", "stop", "reboot", "hardreset", "status").
    pub fn power_named(&self, target: &Target, operation: &str) -> Result<String, RacadmError> {
        let action = operation
            .parse::<PowerAction>()
            .inspect_err(|e| self.report_failure(target, e))?;
        self.power(target, action)
    }

    /// A connected session, or the error from the single attempt.
    pub(crate) fn open(&self, target: &Target) -> Result<Session, RacadmError> {
        let mut session = Session::new(self.config.poll_interval(), self.sleeper.clone());
        session.connect(self.connector.as_ref(), target)?;
        Ok(session)
    }

    pub(crate) fn report(&self, message: &str) {
        self.reporter.report(message);
    }

    pub(crate) fn sleeper(&self) -> &dyn Sleeper {
        self.sleeper.as_ref()
    }

    fn report_failure(&self, target: &Target, e: &RacadmError) {
        error!("{}: {e}", target.name);
        self.reporter.report(&e.to_string());
    }

    fn read_firmware(&self, target: &Target, kind: FirmwareKind) -> Result<Version, RacadmError> {
        self.report(&format!(
            "Getting {kind} Firmware Version for: {}",
            target.name
        ));
        let mut session = self.open(target)?;
        let version = read_sysinfo(&mut session, kind.sysinfo_field())?;
        self.report(&format!("Current version is: {version}"));
        Ok(Version::from(version))
    }

    fn read_disks(&self, target: &Target) -> Result<DiskInventory, RacadmError> {
        let mut session = self.open(target)?;
        let vdisks = session.send_and_wait(VIRTUAL_DISKS_COMMAND, prompt())?;
        let pdisks = session.send_and_wait(PHYSICAL_DISKS_COMMAND, prompt())?;
        session.close();
        Ok(DiskInventory {
            virtual_disks: storage::parse_virtual_disks(&vdisks)?,
            physical_disks: storage::parse_physical_disks(&pdisks)?,
        })
    }
}

/// Enter the racadm sub-shell and read one value from `getsysinfo`.
pub(crate) fn read_sysinfo(
    session: &mut Session,
    field: SysInfoField,
) -> Result<String, RacadmError> {
    session.send_and_wait("racadm", prompt())?;
    let dump = session.send_and_wait(SYSINFO_COMMAND, prompt())?;
    field.parse(&dump)
}

impl Lifecycle for Idrac {
    fn get_running_os(&self, target: &Target) -> Result<String, RacadmError> {
        info!("Getting OS info of {}", target.name);
        self.report(&format!("Getting OS for: {}", target.name));
        let os = self
            .open(target)
            .and_then(|mut session| read_sysinfo(&mut session, SysInfoField::OsName))
            .inspect_err(|e| self.report_failure(target, e))?;
        self.report(&format!("OS Version: for: {} Is: {os}", target.name));
        self.report("Done");
        Ok(os)
    }

    fn get_firmware(&self, target: &Target, kind: FirmwareKind) -> Result<Version, RacadmError> {
        info!("Getting firmware info of {kind} for {}", target.name);
        let version = self
            .read_firmware(target, kind)
            .inspect_err(|e| self.report_failure(target, e))?;
        self.report("Done");
        Ok(version)
    }

    fn power(&self, target: &Target, action: PowerAction) -> Result<String, RacadmError> {
        info!("Power operation {action} for {}", target.name);
        let reply = self
            .open(target)
            .and_then(|mut session| session.send_and_wait(&action.command(), prompt()))
            .inspect_err(|e| self.report_failure(target, e))?;
        let summary = PowerAction::summarize(&reply);
        info!("Answer for power operation on {}: {summary}", target.name);
        self.report(&summary);
        Ok(summary)
    }

    fn update_firmware(
        &self,
        target: &Target,
        kind: FirmwareKind,
    ) -> Result<UpdateReport, RacadmError> {
        info!("Updating {kind} firmware for {}", target.name);
        FirmwareUpdater::new(self, target)
            .run(kind)
            .inspect_err(|e| self.report_failure(target, e))
    }

    fn get_disks(&self, target: &Target) -> Result<DiskInventory, RacadmError> {
        info!("Getting virtual and physical disks for {}", target.name);
        let inventory = self
            .read_disks(target)
            .inspect_err(|e| self.report_failure(target, e))?;
        self.report(&inventory.to_string());
        Ok(inventory)
    }

    fn change_password(
        &self,
        target: &Target,
        new_password: &str,
    ) -> Result<Target, RacadmError> {
        info!("Changing root password for {}", target.name);
        if new_password.is_empty() {
            let e = RacadmError::InvalidInput("empty password".to_string());
            self.report_failure(target, &e);
            return Err(e);
        }
        self.report("Going to change root password");
        let command = format!("racadm set iDRAC.Users.{ROOT_USER_SLOT}.Password");
        let output = self
            .open(target)
            .and_then(|mut session| {
                session.send_secret_and_wait(
                    &format!("{command} {new_password}"),
                    new_password,
                    prompt(),
                )
            })
            .inspect_err(|e| self.report_failure(target, e))?;
        if !parse::strip_echo(&output).contains("successfully") {
            let e = RacadmError::CommandRejected {
                command: format!("{command} {MASK}"),
                // the echo carries the new password
                output: redact(&output, Some(new_password)).trim().to_string(),
            };
            self.report_failure(target, &e);
            return Err(e);
        }
        self.report(&format!("Successfully changed password for {}", target.name));
        Ok(target.with_password(new_password))
    }
}

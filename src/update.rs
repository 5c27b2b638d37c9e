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
//! The firmware update state machine.
//!
//! `racadm update` only queues a job, so an update is a sequence of phases:
//! read the current version, enable the Lifecycle Controller, submit, find the
//! job, poll it, reboot the host if the job waits for one, reconnect and read
//! the version again. The controller often resets itself part way through,
//! dropping the SSH session, so the poll loop does not get the final say: any
//! error in it other than the job reporting failure is logged and the version
//! check after reconnecting decides the outcome. That recovery is deliberately
//! broad and also covers errors that have nothing to do with the reset, such
//! as an unexpected job queue format.
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::{
    console::{prompt, Session},
    dell::{read_sysinfo, Idrac},
    job,
    model::{
        update_service::ENABLE_UPDATE_MODE_COMMAND, FirmwareKind, FirmwareUpdateRequest,
        JobStatus, UpdateOutcome, UpdatePolicy, UpdateReport,
    },
    network::Target,
    Lifecycle, PowerAction, RacadmError, Version,
};

pub struct FirmwareUpdater<'a> {
    idrac: &'a Idrac,
    target: &'a Target,
    policy: &'a UpdatePolicy,
}

impl<'a> FirmwareUpdater<'a> {
    pub fn new(idrac: &'a Idrac, target: &'a Target) -> Self {
        FirmwareUpdater {
            idrac,
            target,
            policy: &idrac.config().update,
        }
    }

    pub fn run(&self, kind: FirmwareKind) -> Result<UpdateReport, RacadmError> {
        match kind {
            FirmwareKind::Bios => self.idrac.report("Going to update BIOS version."),
            FirmwareKind::Controller => self
                .idrac
                .report("Going to update iDRAC & LifeCycle Controller version."),
        }
        let request = self.baseline(kind)?;
        self.idrac.report(&format!(
            "Current FW Version is: {}",
            request.version_before_update
        ));

        let mut session = self.idrac.open(self.target)?;
        session.send_and_wait(ENABLE_UPDATE_MODE_COMMAND, prompt())?;
        let transfer = &self.idrac.config().transfer;
        info!(
            "Submitting {} from {} to {}",
            request.image_file_name,
            transfer.path(),
            self.target.name
        );
        session.send_secret_and_wait(
            &transfer.update_command(&request.image_file_name),
            &transfer.password,
            prompt(),
        )?;
        let job = job::locate_update_job(&mut session)?;
        info!("Firmware update job {} created: {}", job.job_id, job.message);
        self.idrac.report(&job.message);

        match self.poll(session, &job.job_id) {
            Ok(()) => {}
            Err(
                e @ (RacadmError::UpdateFailed { .. }
                | RacadmError::UpdateError { .. }
                | RacadmError::PollTimeout { .. }),
            ) => return Err(e),
            Err(e) => {
                warn!(
                    "Got error while polling job {} (could be a false positive due to the iDRAC resetting itself): {e}",
                    job.job_id
                );
                self.idrac.sleeper().sleep(self.policy.settle_delay);
            }
        }
        self.verify(&request, &job.job_id)
    }

    fn baseline(&self, kind: FirmwareKind) -> Result<FirmwareUpdateRequest, RacadmError> {
        let mut session = self.idrac.open(self.target)?;
        let version = read_sysinfo(&mut session, kind.sysinfo_field())?;
        Ok(FirmwareUpdateRequest {
            kind,
            image_file_name: self.idrac.config().images.file_name(kind).to_string(),
            version_before_update: Version::from(version),
        })
    }

    // Consumes the session: it is closed on every way out.
    fn poll(&self, mut session: Session, job_id: &str) -> Result<(), RacadmError> {
        let started = Instant::now();
        loop {
            let job = job::check_job(&mut session, job_id)?;
            match job.status {
                JobStatus::Failed => {
                    return Err(RacadmError::UpdateFailed {
                        message: job.message,
                    })
                }
                JobStatus::Error => {
                    return Err(RacadmError::UpdateError {
                        message: job.message,
                    })
                }
                _ if job.is_scheduled() => {
                    info!("Firmware update is scheduled, rebooting: {}", job.message);
                    self.idrac.report(&job.message);
                    self.idrac.report("Rebooting Server...");
                    session.close();
                    self.idrac.power(self.target, PowerAction::PowerCycle)?;
                    self.idrac.sleeper().sleep(self.policy.settle_delay);
                    return Ok(());
                }
                JobStatus::Completed => {
                    info!("Firmware update completed: {}", job.message);
                    self.idrac.report(&job.message);
                    return Ok(());
                }
                _ => {
                    debug!("Firmware update status: {job}");
                    self.idrac.report(&job.message);
                }
            }
            if let Some(max) = self.policy.max_poll_duration {
                let waited = started.elapsed();
                if waited >= max {
                    return Err(RacadmError::PollTimeout {
                        job_id: job_id.to_string(),
                        waited_secs: waited.as_secs(),
                    });
                }
            }
            self.idrac.sleeper().sleep(self.policy.poll_delay);
        }
    }

    fn verify(
        &self,
        request: &FirmwareUpdateRequest,
        job_id: &str,
    ) -> Result<UpdateReport, RacadmError> {
        self.idrac
            .report("Trying to reconnect to the iDRAC (Might take up-to 3 minutes)");
        let mut session = self.reconnect()?;

        // BIOS images are applied during POST, after the controller is back
        if request.kind == FirmwareKind::Bios {
            self.await_job(&mut session, job_id)?;
        }

        let field = request.kind.sysinfo_field();
        let after = match read_sysinfo(&mut session, field) {
            Ok(v) => v,
            Err(e) => {
                warn!("Got error while trying to query for FW version, retrying: {e}");
                read_sysinfo(&mut session, field).map_err(|e| RacadmError::VersionRead {
                    source: Box::new(e),
                })?
            }
        };
        session.close();

        let after = Version::from(after);
        let report = UpdateReport {
            kind: request.kind,
            job_id: job_id.to_string(),
            outcome: UpdateOutcome::classify(&request.version_before_update, &after),
            before: request.version_before_update.clone(),
            after,
        };
        info!("Updating firmware completed: {report}");
        self.idrac.report(&report.to_string());
        self.idrac.report("Done Updating Firmware");
        Ok(report)
    }

    fn reconnect(&self) -> Result<Session, RacadmError> {
        let attempts = self.policy.reconnect_attempts;
        for attempt in 1..=attempts {
            info!(
                "Trying to re-connect to \"{}\"... attempt {attempt} of {attempts}",
                self.target.name
            );
            match self.idrac.open(self.target) {
                Ok(session) => return Ok(session),
                Err(e) => {
                    warn!("Failed to connect to \"{}\": {e}", self.target.name);
                    if attempt < attempts {
                        self.idrac.sleeper().sleep(self.policy.reconnect_delay);
                    }
                }
            }
        }
        Err(RacadmError::ReconnectExhausted {
            name: self.target.name.clone(),
            attempts,
        })
    }

    // Same status rules as the main loop, minus the reboot: by now the host
    // has already been power cycled.
    fn await_job(&self, session: &mut Session, job_id: &str) -> Result<(), RacadmError> {
        for _ in 0..self.policy.verify_poll_attempts {
            let job = job::check_job(session, job_id)?;
            match job.status {
                JobStatus::Failed => {
                    return Err(RacadmError::UpdateFailed {
                        message: job.message,
                    })
                }
                JobStatus::Error => {
                    return Err(RacadmError::UpdateError {
                        message: job.message,
                    })
                }
                JobStatus::Completed => {
                    info!("Job completed: {}", job.message);
                    self.idrac.report(&job.message);
                    return Ok(());
                }
                _ => {
                    debug!("Job status: {job}");
                    self.idrac.report(&job.message);
                    self.idrac.sleeper().sleep(self.policy.verify_poll_delay);
                }
            }
        }
        warn!(
            "Job {job_id} not completed after {} checks, reading the version anyway",
            self.policy.verify_poll_attempts
        );
        Ok(())
    }
}

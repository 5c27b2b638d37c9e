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
//! Querying the controller's job queue. Looping is left to the callers since
//! they disagree on what counts as finished.
use tracing::debug;

use crate::console::{prompt, Session};
use crate::model::job::{self, JobRecord, JOB_QUEUE_COMMAND};
use crate::RacadmError;

/// One look at the queue for `job_id`.
pub fn check_job(session: &mut Session, job_id: &str) -> Result<JobRecord, RacadmError> {
    let dump = session.send_and_wait(JOB_QUEUE_COMMAND, prompt())?;
    let (message, status) = job::job_status(&dump, job_id)?;
    let record = JobRecord::new(job_id, message, &status);
    debug!("Job {job_id}: status '{status}' ({})", record.status);
    Ok(record)
}

/// Find the job a `racadm update` just created.
pub fn locate_update_job(session: &mut Session) -> Result<JobRecord, RacadmError> {
    let dump = session.send_and_wait(JOB_QUEUE_COMMAND, prompt())?;
    job::find_update_job(&dump)
}

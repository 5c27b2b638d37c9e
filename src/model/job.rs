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
use std::{fmt, sync::OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::parse::{self, Field};
use crate::RacadmError;

pub const JOB_QUEUE_COMMAND: &str = "racadm jobqueue view";

/// Each job in `racadm jobqueue view` starts with a `[Job ID=JID_...]` line.
pub const JOB_DELIMITER: &str = "Job ID";
pub const MESSAGE: Field = Field::line("Message=");
pub const STATUS: Field = Field::line("Status=");

// Markers of the job racadm creates for `racadm update`
const DOWNLOADING: &str = "Downloading";
const FIRMWARE_UPDATE: &str = "Firmware Update";

fn job_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"JID_\w+").unwrap())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
pub enum JobStatus {
    Unknown,
    InProgress,
    Scheduled,
    Completed,
    Failed,
    Error,
}

impl JobStatus {
    /// Status text is matched by substring, in order, so "Completed with Errors" is an Error.
    pub fn classify(status: &str) -> JobStatus {
        const IN_PROGRESS: [&str; 6] = [
            "Running",
            "Downloading",
            "Downloaded",
            "New",
            "Ready",
            "Waiting",
        ];
        if status.contains("Failed") {
            JobStatus::Failed
        } else if status.contains("Error") {
            JobStatus::Error
        } else if status.contains("Completed") {
            JobStatus::Completed
        } else if status.contains("Scheduled") {
            JobStatus::Scheduled
        } else if IN_PROGRESS.iter().any(|s| status.contains(s)) {
            JobStatus::InProgress
        } else {
            JobStatus::Unknown
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A snapshot of one job in the controller's queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub job_id: String,
    pub message: String,
    pub status: JobStatus,
}

impl JobRecord {
    pub fn new(job_id: &str, message: String, raw_status: &str) -> Self {
        JobRecord {
            job_id: job_id.to_string(),
            message,
            status: JobStatus::classify(raw_status),
        }
    }

    /// racadm reports "Task successfully scheduled." once the image is staged
    /// and the host has to reboot to apply it.
    pub fn is_scheduled(&self) -> bool {
        self.message.to_lowercase().contains("scheduled")
    }
}

impl fmt::Display for JobRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.job_id, self.status, self.message)
    }
}

/// Message and raw status of `job_id` in a queue dump.
///
/// A job submitted moments ago may not be listed yet. In that case the status
/// is "Error" and the message is the whole dump.
pub fn job_status(dump: &str, job_id: &str) -> Result<(String, String), RacadmError> {
    match parse::chunks(dump, JOB_DELIMITER).find(|job| job.contains(job_id)) {
        Some(job) => Ok((
            parse::extract_owned(job, &MESSAGE)?,
            parse::extract_owned(job, &STATUS)?,
        )),
        None => Ok((dump.trim().to_string(), "Error".to_string())),
    }
}

/// The firmware update job in a queue dump: the last job that is downloading a
/// firmware update. Returns the message of the best candidate on failure.
pub fn find_update_job(dump: &str) -> Result<JobRecord, RacadmError> {
    let mut found = None;
    let mut message = String::new();
    for job in parse::chunks(dump, JOB_DELIMITER) {
        if !(job.contains(DOWNLOADING) && job.contains(FIRMWARE_UPDATE)) {
            continue;
        }
        message = parse::extract_owned(job, &MESSAGE).unwrap_or_default();
        let status = parse::extract(job, &STATUS).unwrap_or_default();
        if let Some(id) = job_id_pattern().find(job) {
            found = Some(JobRecord::new(id.as_str(), message.clone(), status));
        }
    }
    found.ok_or(RacadmError::JobNotFound { message })
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUEUE: &str = include_str!("testdata/jobqueue.txt");

    #[test]
    fn test_job_status_picks_matching_job() {
        let (message, status) = job_status(QUEUE, "JID_448659384930").unwrap();
        assert_eq!(message, "[JCP000: Downloading]");
        assert_eq!(status, "Downloading");

        let (message, status) = job_status(QUEUE, "JID_448659000002").unwrap();
        assert_eq!(message, "[PR19: Job completed successfully.]");
        assert_eq!(status, "Completed");
    }

    #[test]
    fn test_job_status_absent_job() {
        let (message, status) = job_status(QUEUE, "JID_000000000000").unwrap();
        assert_eq!(status, "Error");
        assert_eq!(message, QUEUE.trim());
    }

    #[test]
    fn test_find_update_job() {
        let job = find_update_job(QUEUE).unwrap();
        assert_eq!(job.job_id, "JID_448659384930");
        assert_eq!(job.message, "[JCP000: Downloading]");
        assert_eq!(job.status, JobStatus::InProgress);
    }

    #[test]
    fn test_find_update_job_missing() {
        let dump = "racadm jobqueue view\r\n-------------------------JOB QUEUE------------------------\r\n/admin1-> ";
        assert!(matches!(
            find_update_job(dump),
            Err(RacadmError::JobNotFound { .. })
        ));
    }

    #[test]
    fn test_classify() {
        let cases = [
            ("Failed", JobStatus::Failed),
            ("Completed with Errors", JobStatus::Error),
            ("Completed", JobStatus::Completed),
            ("Scheduled", JobStatus::Scheduled),
            ("Downloading", JobStatus::InProgress),
            ("Running", JobStatus::InProgress),
            ("", JobStatus::Unknown),
        ];
        for (raw, expected) in cases {
            assert_eq!(JobStatus::classify(raw), expected, "{raw}");
        }
    }

    #[test]
    fn test_is_scheduled() {
        let job = JobRecord::new("JID_1", "Task successfully scheduled.".to_string(), "Scheduled");
        assert!(job.is_scheduled());
        let job = JobRecord::new("JID_1", "[JCP000: Downloading]".to_string(), "Downloading");
        assert!(!job.is_scheduled());
    }
}

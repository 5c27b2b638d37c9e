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
#[derive(thiserror::Error, Debug)]
pub enum RacadmError {
    #[error("Could not connect to iDRAC at {host}. {source}")]
    Connection {
        host: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to connect to \"{name}\" after {attempts} times")]
    ReconnectExhausted { name: String, attempts: u32 },

    #[error("Console session is not connected")]
    NotConnected,

    #[error("Bad Input: {0}")]
    InvalidInput(String),

    #[error("Couldn't get Job ID: {message}")]
    JobNotFound { message: String },

    #[error("Failed to Update Firmware: {message}")]
    UpdateFailed { message: String },

    #[error("Got Error running Update Firmware: {message}")]
    UpdateError { message: String },

    #[error("Job {job_id} still running after {waited_secs}s")]
    PollTimeout { job_id: String, waited_secs: u64 },

    #[error("Field '{label}' missing from console output")]
    FieldNotFound { label: String },

    #[error("Could not read firmware version after reconnecting. {source}")]
    VersionRead { source: Box<RacadmError> },

    #[error("'{command}' was rejected: {output}")]
    CommandRejected { command: String, output: String },

    #[error("SSH error: {0}")]
    Ssh(#[from] ssh2::Error),

    #[error("Console I/O error: {0}")]
    Io(#[from] std::io::Error),
}

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
use std::{
    io::{ErrorKind, Read, Write},
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::RacadmError;

/// Port the iDRAC SSH console listens on.
pub const MANAGEMENT_PORT: u16 = 22;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(20);
const RECV_BUFFER_SIZE: usize = 9999;

/// The management controller an operation runs against.
///
/// The password only changes through a successful credential rotation, which hands back a new
/// `Target` rather than mutating this one.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Hostname or IP address of the iDRAC
    pub host: String,
    /// SSH port, 22 unless overridden
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Human readable name used in progress messages
    pub name: String,
}

fn default_port() -> u16 {
    MANAGEMENT_PORT
}

impl Target {
    pub fn new(host: &str, user: &str, password: &str) -> Self {
        Target {
            host: host.to_string(),
            port: MANAGEMENT_PORT,
            user: user.to_string(),
            password: password.to_string(),
            name: host.to_string(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub(crate) fn with_password(&self, password: &str) -> Self {
        Target {
            password: password.to_string(),
            ..self.clone()
        }
    }
}

// Never print the password
impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// An interactive shell channel on the management controller.
pub trait Console {
    /// Write raw text to the shell.
    fn send(&mut self, data: &str) -> Result<(), RacadmError>;

    /// Everything received since the last call. Does not wait; returns an empty buffer if
    /// nothing arrived.
    fn recv(&mut self) -> Result<Vec<u8>, RacadmError>;

    /// Close the channel and the transport under it.
    fn close(&mut self) -> Result<(), RacadmError>;
}

/// Opens console channels. Each call makes exactly one connection attempt.
pub trait Connector {
    fn connect(&self, target: &Target) -> Result<Box<dyn Console>, RacadmError>;
}

#[derive(Debug)]
pub struct ConnectorBuilder {
    timeout: Duration,
    keepalive: Option<u32>,
}

impl ConnectorBuilder {
    /// Overwrites the timeout applied to the TCP connect and the SSH handshake
    pub fn timeout(mut self, timeout: Duration) -> ConnectorBuilder {
        self.timeout = timeout;
        self
    }

    /// Send SSH keepalives every `interval_secs` seconds
    pub fn keepalive(mut self, interval_secs: u32) -> ConnectorBuilder {
        self.keepalive = Some(interval_secs);
        self
    }

    pub fn build(&self) -> SshConnector {
        SshConnector {
            timeout: self.timeout,
            keepalive: self.keepalive,
        }
    }
}

/// Connects to the iDRAC over SSH with password authentication and starts a shell on a PTY.
#[derive(Debug, Clone)]
pub struct SshConnector {
    timeout: Duration,
    keepalive: Option<u32>,
}

impl SshConnector {
    pub fn builder() -> ConnectorBuilder {
        ConnectorBuilder {
            timeout: DEFAULT_CONNECT_TIMEOUT,
            keepalive: None,
        }
    }

    fn handshake(&self, target: &Target) -> Result<SshConsole, RacadmError> {
        let addr = (target.host.as_str(), target.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                std::io::Error::new(
                    ErrorKind::NotFound,
                    format!("no address for {}", target.host),
                )
            })?;
        let tcp = TcpStream::connect_timeout(&addr, self.timeout)?;

        let mut session = ssh2::Session::new()?;
        session.set_tcp_stream(tcp);
        session.set_timeout(timeout_millis(self.timeout));
        session.handshake()?;
        session.userauth_password(&target.user, &target.password)?;
        if !session.authenticated() {
            return Err(RacadmError::Io(std::io::Error::new(
                ErrorKind::PermissionDenied,
                "SSH authentication failed",
            )));
        }
        if let Some(interval) = self.keepalive {
            session.set_keepalive(true, interval);
        }
        // Reads wait for the prompt through polling, not through libssh2
        session.set_timeout(0);

        let mut channel = session.channel_session()?;
        channel.request_pty("xterm", None, None)?;
        channel.shell()?;
        Ok(SshConsole {
            session,
            channel,
            closed: false,
        })
    }
}

// libssh2 takes milliseconds as u32; longer timeouts saturate.
fn timeout_millis(timeout: Duration) -> u32 {
    u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX)
}

impl Default for SshConnector {
    fn default() -> Self {
        SshConnector::builder().build()
    }
}

impl Connector for SshConnector {
    fn connect(&self, target: &Target) -> Result<Box<dyn Console>, RacadmError> {
        debug!(
            "Connecting SSH to {}:{} as {}",
            target.host, target.port, target.user
        );
        match self.handshake(target) {
            Ok(console) => Ok(Box::new(console)),
            Err(e) => Err(RacadmError::Connection {
                host: target.host.clone(),
                source: Box::new(e),
            }),
        }
    }
}

/// A shell channel together with the SSH session that carries it. Both are torn down together.
pub struct SshConsole {
    session: ssh2::Session,
    channel: ssh2::Channel,
    closed: bool,
}

impl Console for SshConsole {
    fn send(&mut self, data: &str) -> Result<(), RacadmError> {
        self.session.set_blocking(true);
        self.channel.write_all(data.as_bytes())?;
        self.channel.flush()?;
        Ok(())
    }

    fn recv(&mut self) -> Result<Vec<u8>, RacadmError> {
        self.session.set_blocking(false);
        let mut received = Vec::new();
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        loop {
            match self.channel.read(&mut buf) {
                Ok(0) => {
                    if self.channel.eof() && received.is_empty() {
                        return Err(RacadmError::Io(std::io::Error::new(
                            ErrorKind::UnexpectedEof,
                            "remote closed the console",
                        )));
                    }
                    break;
                }
                Ok(n) => received.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => return Err(e.into()),
            }
        }
        self.session.set_blocking(true);
        Ok(received)
    }

    fn close(&mut self) -> Result<(), RacadmError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.session.set_blocking(true);
        let channel_result = self.channel.close();
        let session_result = self.session.disconnect(None, "closing", None);
        channel_result?;
        session_result?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_millis() {
        assert_eq!(timeout_millis(DEFAULT_CONNECT_TIMEOUT), 20_000);
        assert_eq!(timeout_millis(Duration::from_secs(u64::MAX)), u32::MAX);
        assert_eq!(
            timeout_millis(Duration::from_millis(u64::from(u32::MAX) + 1)),
            u32::MAX
        );
    }

    #[test]
    fn test_target_debug_hides_password() {
        let target = Target::new("10.0.0.20", "root", "calvin").with_name("rack7-node3");
        let printed = format!("{target:?}");
        assert!(printed.contains("rack7-node3"));
        assert!(!printed.contains("calvin"));
    }
}

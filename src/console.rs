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
use std::{borrow::Cow, fmt, sync::Arc, sync::OnceLock, time::Duration};

use regex::Regex;
use tracing::debug;

use crate::network::{Connector, Console, Target};
use crate::RacadmError;

/// How often the console is polled for more output while waiting for a prompt.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Every racadm reply ends at a prompt containing this character, both in the
/// `/admin1->` shell and inside the `racadm>>` sub-shell.
pub fn prompt() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(">").unwrap())
}

/// Printed in place of a credential.
pub const MASK: &str = "********";

/// `text` with every occurrence of `secret` replaced by [`MASK`].
pub fn redact<'a>(text: &'a str, secret: Option<&str>) -> Cow<'a, str> {
    match secret {
        Some(secret) if !secret.is_empty() && text.contains(secret) => {
            Cow::Owned(text.replace(secret, MASK))
        }
        _ => Cow::Borrowed(text),
    }
}

/// Blocks the calling thread between polls. Swappable so callers can drive
/// the state machines without real delays.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Ready,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One interactive racadm console. Owned by the operation that opened it and
/// closed when dropped.
pub struct Session {
    console: Option<Box<dyn Console>>,
    state: SessionState,
    poll_interval: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl Session {
    pub fn new(poll_interval: Duration, sleeper: Arc<dyn Sleeper>) -> Self {
        Session {
            console: None,
            state: SessionState::Disconnected,
            poll_interval,
            sleeper,
        }
    }

    /// Makes a single connection attempt. Retrying is up to the caller.
    pub fn connect(
        &mut self,
        connector: &dyn Connector,
        target: &Target,
    ) -> Result<(), RacadmError> {
        self.close();
        self.state = SessionState::Connecting;
        debug!("Connecting to {} ({}) as {}", target.name, target.host, target.user);
        match connector.connect(target) {
            Ok(console) => {
                self.console = Some(console);
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(e) => {
                debug!("Got error while connecting to {}: {e}", target.name);
                self.state = SessionState::Disconnected;
                Err(e)
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Send one command line and collect output until `expect` matches anywhere in what has
    /// been received so far, including the echo of the command itself.
    ///
    /// There is no deadline: if the pattern never shows up this polls forever.
    /// Callers bound it with their own attempt counts.
    pub fn send_and_wait(&mut self, command: &str, expect: &Regex) -> Result<String, RacadmError> {
        self.exchange(command, None, expect)
    }

    /// [`Session::send_and_wait`] for a command line carrying a credential. `secret` is masked
    /// in the log, both in the command and in its echo. The reply is returned as received.
    pub fn send_secret_and_wait(
        &mut self,
        command: &str,
        secret: &str,
        expect: &Regex,
    ) -> Result<String, RacadmError> {
        self.exchange(command, Some(secret), expect)
    }

    fn exchange(
        &mut self,
        command: &str,
        secret: Option<&str>,
        expect: &Regex,
    ) -> Result<String, RacadmError> {
        let Some(console) = self.console.as_mut() else {
            return Err(RacadmError::NotConnected);
        };
        debug!("TX {} : wait for : {expect}", redact(command, secret));
        console.send(&format!("{command}\n"))?;

        let mut received: Vec<u8> = Vec::new();
        loop {
            self.sleeper.sleep(self.poll_interval);
            received.extend(console.recv()?);
            // decode the whole buffer so multi-byte characters split across reads survive
            let text = String::from_utf8_lossy(&received);
            if expect.is_match(&text) {
                debug!("RX {}", redact(&text, secret));
                return Ok(text.into_owned());
            }
        }
    }

    /// Best effort teardown. Safe to call any number of times and never fails, so it can run on
    /// error paths without hiding the original error.
    pub fn close(&mut self) {
        if let Some(mut console) = self.console.take() {
            if let Err(e) = console.close() {
                debug!("Ignoring error while closing console: {e}");
            }
            self.state = SessionState::Closed;
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    struct NoSleep;

    impl Sleeper for NoSleep {
        fn sleep(&self, _duration: Duration) {}
    }

    #[derive(Default)]
    struct Recorded {
        sent: Vec<String>,
        recv_calls: usize,
        closes: usize,
    }

    struct ChunkedConsole {
        chunks: VecDeque<&'static str>,
        recorded: Arc<Mutex<Recorded>>,
        fail_close: bool,
    }

    impl Console for ChunkedConsole {
        fn send(&mut self, data: &str) -> Result<(), RacadmError> {
            self.recorded.lock().unwrap().sent.push(data.to_string());
            Ok(())
        }

        fn recv(&mut self) -> Result<Vec<u8>, RacadmError> {
            self.recorded.lock().unwrap().recv_calls += 1;
            Ok(self
                .chunks
                .pop_front()
                .map(|c| c.as_bytes().to_vec())
                .unwrap_or_default())
        }

        fn close(&mut self) -> Result<(), RacadmError> {
            self.recorded.lock().unwrap().closes += 1;
            if self.fail_close {
                return Err(RacadmError::NotConnected);
            }
            Ok(())
        }
    }

    struct OneShot {
        chunks: Vec<&'static str>,
        recorded: Arc<Mutex<Recorded>>,
        fail_close: bool,
    }

    impl Connector for OneShot {
        fn connect(&self, _target: &Target) -> Result<Box<dyn Console>, RacadmError> {
            Ok(Box::new(ChunkedConsole {
                chunks: self.chunks.iter().copied().collect(),
                recorded: self.recorded.clone(),
                fail_close: self.fail_close,
            }))
        }
    }

    fn open(chunks: Vec<&'static str>, fail_close: bool) -> (Session, Arc<Mutex<Recorded>>) {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let connector = OneShot {
            chunks,
            recorded: recorded.clone(),
            fail_close,
        };
        let mut session = Session::new(Duration::ZERO, Arc::new(NoSleep));
        session
            .connect(&connector, &Target::new("10.0.0.1", "root", "calvin"))
            .unwrap();
        (session, recorded)
    }

    #[test]
    fn test_send_and_wait_across_chunks() {
        let (mut session, recorded) = open(
            vec!["getsysinfo\r\n", "", "RAC Information:\r\n/admin", "1-> ", "late"],
            false,
        );
        let expect = Regex::new("admin1->").unwrap();
        let out = session.send_and_wait("getsysinfo", &expect).unwrap();
        assert_eq!(out, "getsysinfo\r\nRAC Information:\r\n/admin1-> ");

        let recorded = recorded.lock().unwrap();
        assert_eq!(recorded.sent, vec!["getsysinfo\n".to_string()]);
        // returns on the first poll where the pattern is complete
        assert_eq!(recorded.recv_calls, 4);
    }

    #[test]
    fn test_send_and_wait_matches_echo() {
        let (mut session, _recorded) = open(vec!["racadm>>"], false);
        let out = session.send_and_wait("racadm", prompt()).unwrap();
        assert_eq!(out, "racadm>>");
    }

    #[test]
    fn test_close_is_idempotent_and_swallows_errors() {
        let (mut session, recorded) = open(vec![], true);
        assert_eq!(session.state(), SessionState::Ready);
        session.close();
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        drop(session);
        assert_eq!(recorded.lock().unwrap().closes, 1);
    }

    #[test]
    fn test_send_after_close() {
        let (mut session, _recorded) = open(vec![">"], false);
        session.close();
        assert!(matches!(
            session.send_and_wait("racadm", prompt()),
            Err(RacadmError::NotConnected)
        ));
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_secret_kept_out_of_log() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let (mut session, _recorded) = open(
            vec![
                "racadm set iDRAC.Users.2.Password n3w-Secret\r\n",
                "Object value modified successfully\r\n/admin1-> ",
            ],
            false,
        );

        let out = tracing::subscriber::with_default(subscriber, || {
            session.send_secret_and_wait(
                "racadm set iDRAC.Users.2.Password n3w-Secret",
                "n3w-Secret",
                prompt(),
            )
        })
        .unwrap();
        assert!(out.contains("modified successfully"));

        let logged = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("TX racadm set iDRAC.Users.2.Password ********"));
        assert!(logged.contains("RX racadm set iDRAC.Users.2.Password ********"));
        assert!(!logged.contains("n3w-Secret"), "{logged}");
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact("update -p hunter2 -l x", Some("hunter2")), "update -p ******** -l x");
        assert_eq!(redact("getsysinfo", Some("hunter2")), "getsysinfo");
        assert_eq!(redact("getsysinfo", Some("")), "getsysinfo");
        assert_eq!(redact("getsysinfo", None), "getsysinfo");
    }

    #[test]
    fn test_drop_closes() {
        let (session, recorded) = open(vec![], false);
        drop(session);
        assert_eq!(recorded.lock().unwrap().closes, 1);
    }
}

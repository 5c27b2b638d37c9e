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
//! A scripted stand-in for an iDRAC. Each connection plays back a list of
//! (command prefix, reply) exchanges; replies are delivered in two pieces so
//! prompt matching has to work across reads.
use std::{
    collections::VecDeque,
    io::ErrorKind,
    sync::{Arc, Mutex},
    time::Duration,
};

use libracadm::{Connector, Console, RacadmError, Sleeper, Target};

pub const PROMPT: &str = "/admin1-> ";

// Give up on a reply that never completes instead of hanging the test
const MAX_EMPTY_READS: usize = 100;

pub enum Reply {
    Text(String),
    /// The controller drops the connection when this command is sent
    Disconnect,
}

pub struct Exchange {
    command: &'static str,
    reply: Reply,
}

pub fn exchange(command: &'static str, reply: String) -> Exchange {
    Exchange {
        command,
        reply: Reply::Text(reply),
    }
}

pub fn disconnect(command: &'static str) -> Exchange {
    Exchange {
        command,
        reply: Reply::Disconnect,
    }
}

pub enum Connection {
    Refused,
    Script(Vec<Exchange>),
}

#[derive(Debug, Default)]
pub struct Log {
    pub connects: usize,
    pub sent: Vec<String>,
    pub closes: usize,
}

#[derive(Clone, Default)]
pub struct Mockup {
    connections: Arc<Mutex<VecDeque<Connection>>>,
    pub log: Arc<Mutex<Log>>,
}

impl Mockup {
    pub fn new(connections: Vec<Connection>) -> Self {
        Mockup {
            connections: Arc::new(Mutex::new(connections.into_iter().collect())),
            log: Arc::default(),
        }
    }

    pub fn connects(&self) -> usize {
        self.log.lock().unwrap().connects
    }

    pub fn closes(&self) -> usize {
        self.log.lock().unwrap().closes
    }

    pub fn sent(&self) -> Vec<String> {
        self.log.lock().unwrap().sent.clone()
    }

    /// Scripted connections not used by the test
    pub fn remaining(&self) -> usize {
        self.connections.lock().unwrap().len()
    }
}

impl Connector for Mockup {
    fn connect(&self, target: &Target) -> Result<Box<dyn Console>, RacadmError> {
        self.log.lock().unwrap().connects += 1;
        match self.connections.lock().unwrap().pop_front() {
            Some(Connection::Script(exchanges)) => Ok(Box::new(ScriptedConsole {
                exchanges: exchanges.into_iter().collect(),
                pending: VecDeque::new(),
                empty_reads: 0,
                log: self.log.clone(),
            })),
            Some(Connection::Refused) | None => Err(RacadmError::Connection {
                host: target.host.clone(),
                source: "Connection refused".into(),
            }),
        }
    }
}

struct ScriptedConsole {
    exchanges: VecDeque<Exchange>,
    pending: VecDeque<Vec<u8>>,
    empty_reads: usize,
    log: Arc<Mutex<Log>>,
}

fn io_error(kind: ErrorKind, msg: &str) -> RacadmError {
    RacadmError::Io(std::io::Error::new(kind, msg.to_string()))
}

impl Console for ScriptedConsole {
    fn send(&mut self, data: &str) -> Result<(), RacadmError> {
        let command = data.trim_end().to_string();
        self.log.lock().unwrap().sent.push(command.clone());
        let Some(next) = self.exchanges.pop_front() else {
            return Err(io_error(ErrorKind::BrokenPipe, "console closed by peer"));
        };
        assert!(
            command.starts_with(next.command),
            "expected '{}', got '{command}'",
            next.command
        );
        match next.reply {
            Reply::Text(text) => {
                let echoed = format!("{command}\r\n{text}").into_bytes();
                let (head, tail) = echoed.split_at(echoed.len() / 2);
                self.pending.push_back(head.to_vec());
                self.pending.push_back(tail.to_vec());
                Ok(())
            }
            Reply::Disconnect => Err(io_error(ErrorKind::ConnectionReset, "connection reset")),
        }
    }

    fn recv(&mut self) -> Result<Vec<u8>, RacadmError> {
        match self.pending.pop_front() {
            Some(chunk) => {
                self.empty_reads = 0;
                Ok(chunk)
            }
            None => {
                self.empty_reads += 1;
                if self.empty_reads > MAX_EMPTY_READS {
                    return Err(io_error(ErrorKind::TimedOut, "reply never finished"));
                }
                Ok(Vec::new())
            }
        }
    }

    fn close(&mut self) -> Result<(), RacadmError> {
        self.log.lock().unwrap().closes += 1;
        Ok(())
    }
}

/// Records requested delays instead of sleeping.
#[derive(Clone, Default)]
pub struct RecordingSleeper {
    pub delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn count(&self, d: Duration) -> usize {
        self.delays.lock().unwrap().iter().filter(|x| **x == d).count()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/*
 * Console replies
 */

pub fn ok() -> String {
    PROMPT.to_string()
}

pub fn racadm_shell() -> String {
    "racadm>> ".to_string()
}

pub fn sysinfo(bios: &str, firmware: &str) -> String {
    format!(
        "RAC Information:\r\n\
RAC Date/Time           = Thu Mar 14 2024 10:12:01\r\n\
Firmware Version        = {firmware}\r\n\
Firmware Build          = 50\r\n\
\r\n\
System Information:\r\n\
System Model            = PowerEdge R630\r\n\
System BIOS Version     = {bios}\r\n\
OS Name                 = Ubuntu 22.04.3 LTS\r\n\
racadm>> "
    )
}

pub fn job_queue(jobs: &[(&str, &str, &str, &str)]) -> String {
    let mut out = "-------------------------JOB QUEUE------------------------\r\n".to_string();
    for (id, name, status, message) in jobs {
        out.push_str(&format!(
            "[Job ID={id}]\r\nJob Name={name}\r\nStatus={status}\r\nStart Time=[Now]\r\n\
Expiration Time=[Not Applicable]\r\nMessage={message}\r\nPercent Complete=[NA]\r\n\
----------------------------------------------------------\r\n"
        ));
    }
    out.push_str(PROMPT);
    out
}

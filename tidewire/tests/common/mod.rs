#![allow(dead_code)]

use bytes::Bytes;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use tidewire::{Channel, ConnectionObserver, Error, Interest, Registration, ResponderId};

/// What a [`FakeChannel`] was asked to do, and what it should answer.
#[derive(Default)]
pub struct ChannelScript {
    pub connected: bool,
    pub connect_results: VecDeque<io::Result<bool>>,
    pub read_results: VecDeque<io::Result<Vec<u8>>>,
    /// Results for upcoming writes. When empty, writes accept everything.
    pub write_results: VecDeque<io::Result<usize>>,
    pub written: Vec<u8>,
    pub write_calls: usize,
    pub close_calls: usize,
}

pub struct FakeChannel {
    script: Arc<Mutex<ChannelScript>>,
}

impl FakeChannel {
    pub fn connected() -> (Self, Arc<Mutex<ChannelScript>>) {
        Self::with_state(true)
    }

    pub fn connecting() -> (Self, Arc<Mutex<ChannelScript>>) {
        Self::with_state(false)
    }

    fn with_state(connected: bool) -> (Self, Arc<Mutex<ChannelScript>>) {
        let script = Arc::new(Mutex::new(ChannelScript {
            connected,
            ..ChannelScript::default()
        }));

        (
            Self {
                script: script.clone(),
            },
            script,
        )
    }
}

impl Channel for FakeChannel {
    fn is_connected(&self) -> bool {
        let script = self.script.lock().unwrap();
        script.connected && script.close_calls == 0
    }

    fn finish_connect(&mut self) -> io::Result<bool> {
        let mut script = self.script.lock().unwrap();
        let result = script.connect_results.pop_front().unwrap_or(Ok(true));

        if let Ok(true) = result {
            script.connected = true;
        }
        result
    }

    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        let mut script = self.script.lock().unwrap();

        match script.read_results.pop_front() {
            Some(Ok(data)) => {
                buffer[..data.len()].copy_from_slice(&data);
                Ok(data.len())
            }
            Some(Err(err)) => Err(err),
            None => Err(io::ErrorKind::WouldBlock.into()),
        }
    }

    fn write(&mut self, buffer: &[u8]) -> io::Result<usize> {
        let mut script = self.script.lock().unwrap();
        script.write_calls += 1;

        let n = match script.write_results.pop_front() {
            Some(Ok(n)) => n.min(buffer.len()),
            Some(Err(err)) => return Err(err),
            None => buffer.len(),
        };

        script.written.extend_from_slice(&buffer[..n]);
        Ok(n)
    }

    fn close(&mut self) -> io::Result<()> {
        self.script.lock().unwrap().close_calls += 1;
        Ok(())
    }
}

/// Every interest set installed on a [`FakeRegistration`], in order.
#[derive(Default)]
pub struct RegistrationLog {
    pub interest: Interest,
    pub history: Vec<Interest>,
    pub cancel_calls: usize,
}

impl RegistrationLog {
    pub fn write_calls_since(&self, start: usize) -> Vec<bool> {
        self.history[start..].iter().map(|i| i.write).collect()
    }
}

pub struct FakeRegistration {
    log: Arc<Mutex<RegistrationLog>>,
}

impl FakeRegistration {
    pub fn new() -> (Self, Arc<Mutex<RegistrationLog>>) {
        let log = Arc::new(Mutex::new(RegistrationLog::default()));
        (Self { log: log.clone() }, log)
    }
}

impl Registration for FakeRegistration {
    fn interest(&self) -> Interest {
        self.log.lock().unwrap().interest
    }

    fn set_interest(&mut self, interest: Interest) {
        let mut log = self.log.lock().unwrap();
        log.interest = interest;
        log.history.push(interest);
    }

    fn cancel(&mut self) {
        self.log.lock().unwrap().cancel_calls += 1;
    }
}

/// Observer recording every callback as a string.
#[derive(Default)]
pub struct Recorder {
    pub events: Mutex<Vec<String>>,
    pub packets: Mutex<Vec<Bytes>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl ConnectionObserver for Recorder {
    fn connection_opened(&self, _id: ResponderId) {
        self.events.lock().unwrap().push("opened".to_string());
    }

    fn packet_received(&self, _id: ResponderId, packet: Bytes) {
        self.events.lock().unwrap().push("packet".to_string());
        self.packets.lock().unwrap().push(packet);
    }

    fn connection_broken(&self, _id: ResponderId, reason: &Error) {
        let label = match reason {
            Error::Io(_) => "broken:io",
            Error::Eof => "broken:eof",
            Error::PacketTooLarge { .. } => "broken:too-large",
            Error::Closed => "broken:closed",
        };
        self.events.lock().unwrap().push(label.to_string());
    }
}

//! Simulated SynthHD Pro for tests.
//!
//! Speaks the line protocol over `AsyncRead`/`AsyncWrite`, keeps the device
//! state a real unit would, and records every command line it receives.

use std::{
    collections::VecDeque,
    io,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard},
    task::{Context, Poll},
};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

#[derive(Debug, Clone)]
pub(crate) struct SimState {
    pub written: Vec<String>,
    pub fail_writes: bool,
    pub corrupt_replies: bool,
    pub mute: bool,
    /// Number of `p?` polls answered with "unlocked" before the PLL locks.
    pub polls_until_lock: usize,
    pub never_lock: bool,
    pub frequency_mhz: f64,
    pub power: f64,
    pub sweep_start_mhz: f64,
    pub sweep_stop_mhz: f64,
    pub sweep_step_mhz: f64,
    pub sweep_power_start: f64,
    pub sweep_power_stop: f64,
    pub ascending: bool,
    pub running: bool,
    pub output: bool,
    outbound: VecDeque<u8>,
    inbound: Vec<u8>,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            written: Vec::new(),
            fail_writes: false,
            corrupt_replies: false,
            mute: false,
            polls_until_lock: 0,
            never_lock: false,
            frequency_mhz: 1000.0,
            power: 0.0,
            sweep_start_mhz: 1000.0,
            sweep_stop_mhz: 2000.0,
            sweep_step_mhz: 1.0,
            sweep_power_start: 0.0,
            sweep_power_stop: 0.0,
            ascending: true,
            running: false,
            output: true,
            outbound: VecDeque::new(),
            inbound: Vec::new(),
        }
    }
}

impl SimState {
    fn reply(&mut self, line: String) {
        if self.mute {
            return;
        }
        let line = if self.corrupt_replies {
            "ERR".to_string()
        } else {
            line
        };
        self.outbound.extend(line.bytes());
        self.outbound.extend(b"\n".iter());
    }

    fn execute(&mut self, line: &str) {
        self.written.push(line.to_string());
        match line {
            "v0" => self.reply("Firmware Version 3.22".into()),
            "v1" => self.reply("Hardware Version 2.06".into()),
            "+" => self.reply("SynthHD PRO".into()),
            "-" => self.reply("1207".into()),
            "z?" => self.reply("31.5".into()),
            "p?" => {
                let locked = if self.never_lock {
                    false
                } else if self.polls_until_lock > 0 {
                    self.polls_until_lock -= 1;
                    false
                } else {
                    true
                };
                self.reply(if locked { "1" } else { "0" }.into())
            }
            "f?" => self.reply(format!("{:.7}", self.frequency_mhz)),
            "W?" => self.reply(format!("{:.3}", self.power)),
            "g?" => self.reply(if self.running { "1" } else { "0" }.into()),
            "g1" => self.running = true,
            "l?" => self.reply(format!("{:.7}", self.sweep_start_mhz)),
            "u?" => self.reply(format!("{:.7}", self.sweep_stop_mhz)),
            "s?" => self.reply(format!("{:.7}", self.sweep_step_mhz)),
            "[?" => self.reply(format!("{:.3}", self.sweep_power_start)),
            "^1" => self.ascending = true,
            "^0" => self.ascending = false,
            "E1r1h1" => self.output = true,
            "E0r0h0" => {
                self.output = false;
                self.running = false;
            }
            "X0" | "c0" | "w2" => {}
            _ => self.set_value(line),
        }
    }

    fn set_value(&mut self, line: &str) {
        if line.is_empty() {
            return;
        }
        let (prefix, value) = line.split_at(1);
        let Ok(value) = value.parse::<f64>() else {
            return;
        };
        match prefix {
            "f" => self.frequency_mhz = value,
            "W" => self.power = value,
            "l" => self.sweep_start_mhz = value,
            "u" => self.sweep_stop_mhz = value,
            "s" => self.sweep_step_mhz = value,
            "[" => self.sweep_power_start = value,
            "]" => self.sweep_power_stop = value,
            _ => {}
        }
    }
}

pub(crate) struct FakeSynth {
    state: Arc<Mutex<SimState>>,
}

/// Inspects and steers a [`FakeSynth`] after it was handed to a device.
#[derive(Clone)]
pub(crate) struct FakeHandle {
    state: Arc<Mutex<SimState>>,
}

impl FakeHandle {
    pub fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().expect("simulator state poisoned")
    }

    pub fn written(&self) -> Vec<String> {
        self.state().written.clone()
    }

    pub fn clear_written(&self) {
        self.state().written.clear();
    }

    /// Queue a reply line the device sends without being asked.
    pub fn inject(&self, line: &str) {
        let mut state = self.state();
        state.outbound.extend(line.bytes());
        state.outbound.extend(b"\n".iter());
    }

    pub fn count(&self, command: &str) -> usize {
        self.state()
            .written
            .iter()
            .filter(|c| c.as_str() == command)
            .count()
    }
}

impl FakeSynth {
    pub fn new() -> (Self, FakeHandle) {
        let state = Arc::new(Mutex::new(SimState::default()));
        (
            Self {
                state: state.clone(),
            },
            FakeHandle { state },
        )
    }
}

impl AsyncRead for FakeSynth {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let mut state = self.state.lock().expect("simulator state poisoned");
        let n = buf.remaining().min(state.outbound.len());
        let bytes: Vec<u8> = state.outbound.drain(..n).collect();
        // An empty read is EOF, so a missing reply surfaces instead of hanging.
        buf.put_slice(&bytes);
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for FakeSynth {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut state = self.state.lock().expect("simulator state poisoned");
        if state.fail_writes {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "simulated write failure",
            )));
        }
        state.inbound.extend_from_slice(buf);
        while let Some(pos) = state.inbound.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = state.inbound.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..pos]).trim().to_string();
            state.execute(&line);
        }
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

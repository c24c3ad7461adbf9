//! MIDI control input.
//!
//! Control-change messages drive `[0, 100]` parameters, Note-On selects preset
//! slots. Raw MIDI bytes arrive either over UDP (one or more messages per
//! datagram, as emitted by common network MIDI bridges) or via
//! [`MidiAdapter::feed`].

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::foundation::error::{PixliError, PixliResult};
use crate::protocol::{
    AdapterContext, ConnectionState, MessageHandler, ProtocolAdapter, ProtocolParseError,
    log_dropped,
};
use crate::state::delta::{Param, StateDelta};
use crate::state::owner::DeltaSource;
use crate::state::scenes::PRESET_SLOTS;

pub const DEFAULT_PRESET_BASE_NOTE: u8 = 60;
const MAX_DATAGRAM: usize = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOff { channel: u8, note: u8, velocity: u8 },
    NoteOn { channel: u8, note: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    /// Recognized but unmapped (aftertouch, pitch bend, system messages).
    Other { status: u8 },
}

fn data_len(status: u8) -> usize {
    match status {
        // MTC quarter frame, song select
        0xF1 | 0xF3 => 1,
        // song position
        0xF2 => 2,
        0xF0..=0xFF => 0,
        _ => match status & 0xF0 {
            0xC0 | 0xD0 => 1,
            _ => 2,
        },
    }
}

/// Everything decoded from one byte stream, plus the spans that were skipped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MidiBatch {
    pub messages: Vec<MidiMessage>,
    pub errors: Vec<ProtocolParseError>,
}

/// Decode a byte stream, resynchronizing on the next status byte after a bad
/// message so later messages in the same stream survive.
///
/// Running status is honored for channel messages; system common messages
/// clear it. Realtime bytes and SysEx blocks are skipped.
pub fn decode_midi(bytes: &[u8]) -> MidiBatch {
    let mut batch = MidiBatch::default();
    let mut status: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b >= 0xF8 {
            i += 1;
            continue;
        }
        if b == 0xF0 {
            status = None;
            match bytes[i..].iter().position(|&x| x == 0xF7) {
                Some(end) => {
                    i += end + 1;
                    continue;
                }
                None => {
                    batch.errors.push(ProtocolParseError::new("midi", "unterminated sysex"));
                    break;
                }
            }
        }
        let st = if b & 0x80 != 0 {
            i += 1;
            b
        } else if let Some(st) = status {
            st
        } else {
            batch.errors.push(ProtocolParseError::new(
                "midi",
                format!("data byte {b:#04x} without status"),
            ));
            i = next_status(bytes, i);
            continue;
        };
        status = (st < 0xF0).then_some(st);

        let n = data_len(st);
        let avail = bytes[i..]
            .iter()
            .take(n)
            .take_while(|&&d| d & 0x80 == 0)
            .count();
        if avail < n {
            batch.errors.push(ProtocolParseError::new(
                "midi",
                format!("truncated message for status {st:#04x}"),
            ));
            i += avail;
            continue;
        }
        let data = &bytes[i..i + n];
        i += n;

        let channel = st & 0x0F;
        batch.messages.push(match st & 0xF0 {
            0x80 => MidiMessage::NoteOff {
                channel,
                note: data[0],
                velocity: data[1],
            },
            0x90 if data[1] == 0 => MidiMessage::NoteOff {
                channel,
                note: data[0],
                velocity: 0,
            },
            0x90 => MidiMessage::NoteOn {
                channel,
                note: data[0],
                velocity: data[1],
            },
            0xB0 => MidiMessage::ControlChange {
                channel,
                controller: data[0],
                value: data[1],
            },
            0xC0 => MidiMessage::ProgramChange {
                channel,
                program: data[0],
            },
            _ => MidiMessage::Other { status: st },
        });
    }
    batch
}

fn next_status(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|&x| x & 0x80 != 0)
        .map_or(bytes.len(), |p| from + p)
}

/// Strict decode: the first malformed message fails the whole stream.
pub fn parse_midi(bytes: &[u8]) -> Result<Vec<MidiMessage>, ProtocolParseError> {
    let batch = decode_midi(bytes);
    match batch.errors.into_iter().next() {
        Some(e) => Err(e),
        None => Ok(batch.messages),
    }
}

/// `(v / 127) * 100`.
pub fn rescale(value: u8) -> f64 {
    f64::from(value.min(127)) / 127.0 * 100.0
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CcMapping {
    pub controller: u8,
    pub param: Param,
}

pub fn default_cc_mappings() -> Vec<CcMapping> {
    vec![
        CcMapping {
            controller: 1,
            param: Param::MotionIntensity,
        },
        CcMapping {
            controller: 2,
            param: Param::MotionSpeed,
        },
        CcMapping {
            controller: 3,
            param: Param::HueRotationSpeed,
        },
    ]
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct MidiSettings {
    pub enabled: bool,
    /// UDP address to receive raw MIDI on; `None` accepts only [`MidiAdapter::feed`].
    pub bind: Option<SocketAddr>,
    pub cc_mappings: Vec<CcMapping>,
    /// Notes `base..base + 5` load preset slots 1 through 5.
    pub preset_base_note: u8,
}

impl Default for MidiSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: None,
            cc_mappings: default_cc_mappings(),
            preset_base_note: DEFAULT_PRESET_BASE_NOTE,
        }
    }
}

impl MidiSettings {
    /// Map one message onto a delta; unmapped messages yield `None`.
    pub fn to_delta(&self, msg: &MidiMessage) -> Option<StateDelta> {
        match *msg {
            MidiMessage::ControlChange {
                controller, value, ..
            } => self
                .cc_mappings
                .iter()
                .find(|m| m.controller == controller)
                .map(|m| StateDelta::Set(m.param, rescale(value))),
            MidiMessage::NoteOn { note, .. } => {
                let offset = note.checked_sub(self.preset_base_note)?;
                (offset < PRESET_SLOTS).then(|| StateDelta::LoadPreset(offset + 1))
            }
            _ => None,
        }
    }
}

struct MidiRouter {
    ctx: AdapterContext,
    settings: MidiSettings,
    handler: Option<MessageHandler<MidiMessage>>,
}

impl MidiRouter {
    /// Errors only when nothing in `bytes` decoded; otherwise skipped spans are
    /// logged and the decoded messages are routed.
    fn route(&self, bytes: &[u8]) -> Result<usize, ProtocolParseError> {
        let MidiBatch { messages, errors } = decode_midi(bytes);
        let mut errors = errors.into_iter();
        if messages.is_empty()
            && let Some(first) = errors.next()
        {
            errors.for_each(|e| log_dropped(&e));
            return Err(first);
        }
        errors.for_each(|e| log_dropped(&e));
        let mut enqueued = 0;
        for msg in &messages {
            if let Some(handler) = &self.handler {
                handler(msg);
            }
            if let Some(delta) = self.settings.to_delta(msg) {
                tracing::trace!(?msg, ?delta, "midi");
                self.ctx.enqueue(DeltaSource::Midi, delta);
                enqueued += 1;
            }
        }
        Ok(enqueued)
    }
}

pub struct MidiAdapter {
    ctx: AdapterContext,
    settings: MidiSettings,
    handler: Option<MessageHandler<MidiMessage>>,
    router: Arc<MidiRouter>,
    status: watch::Sender<ConnectionState>,
    task: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl MidiAdapter {
    pub fn new(ctx: AdapterContext, settings: MidiSettings) -> Self {
        let router = Arc::new(MidiRouter {
            ctx: ctx.clone(),
            settings: settings.clone(),
            handler: None,
        });
        Self {
            ctx,
            settings,
            handler: None,
            router,
            status: watch::Sender::new(ConnectionState::Disconnected),
            task: None,
            local_addr: None,
        }
    }

    fn rebuild_router(&mut self) {
        self.router = Arc::new(MidiRouter {
            ctx: self.ctx.clone(),
            settings: self.settings.clone(),
            handler: self.handler.clone(),
        });
    }

    /// Inject raw MIDI bytes; returns how many deltas were enqueued.
    /// Malformed spans are logged and dropped; a stream with nothing usable is
    /// reported as an error.
    pub fn feed(&self, bytes: &[u8]) -> Result<usize, ProtocolParseError> {
        self.router.route(bytes).inspect_err(log_dropped)
    }

    /// Bound UDP address once connected with a `bind` setting.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn settings(&self) -> &MidiSettings {
        &self.settings
    }
}

impl ProtocolAdapter for MidiAdapter {
    type Settings = MidiSettings;
    type Message = MidiMessage;

    fn name(&self) -> &'static str {
        "midi"
    }

    async fn connect(&mut self) -> PixliResult<()> {
        if !self.settings.enabled {
            return Err(PixliError::connection("midi input is disabled"));
        }
        if self.status.borrow().is_connected() {
            return Ok(());
        }
        self.status.send_replace(ConnectionState::Connecting);
        if let Some(bind) = self.settings.bind {
            let socket = match UdpSocket::bind(bind).await {
                Ok(s) => s,
                Err(e) => {
                    self.status.send_replace(ConnectionState::Disconnected);
                    return Err(PixliError::connection(format!("midi bind {bind}: {e}")));
                }
            };
            self.local_addr = socket.local_addr().ok();
            let router = Arc::clone(&self.router);
            let status = self.status.clone();
            self.task = Some(tokio::spawn(async move {
                let mut buf = vec![0u8; MAX_DATAGRAM];
                loop {
                    match socket.recv_from(&mut buf).await {
                        Ok((n, _)) => {
                            if let Err(e) = router.route(&buf[..n]) {
                                log_dropped(&e);
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "midi socket closed");
                            status.send_replace(ConnectionState::Disconnected);
                            break;
                        }
                    }
                }
            }));
        }
        tracing::info!(bind = ?self.local_addr, "midi input connected");
        self.status.send_replace(ConnectionState::Connected);
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.local_addr = None;
        self.status.send_replace(ConnectionState::Disconnected);
    }

    fn on_message(&mut self, handler: MessageHandler<MidiMessage>) {
        self.handler = Some(handler);
        self.rebuild_router();
    }

    fn update_settings(&mut self, settings: MidiSettings) {
        self.settings = settings;
        self.rebuild_router();
    }

    fn connection_state(&self) -> ConnectionState {
        self.status.borrow().clone()
    }

    fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.status.subscribe()
    }
}

impl Drop for MidiAdapter {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/protocol/midi.rs"]
mod tests;

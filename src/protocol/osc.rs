//! OSC control input over UDP.
//!
//! Address space (all under `/pixli`):
//!
//! | address                  | arguments         | effect                        |
//! |--------------------------|-------------------|-------------------------------|
//! | `/pixli/preset/load`     | scene id, or slot | load a scene or preset slot   |
//! | `/pixli/motion/intensity`| number `[0, 100]` | set motion intensity          |
//! | `/pixli/motion/speed`    | number `[0, 100]` | set motion speed              |
//! | `/pixli/motion/mode`     | mode name         | select a built-in mode        |
//! | `/pixli/blend/mode`      | blend mode name   | select the blend mode         |
//! | `/pixli/palette/cycle`   | `0` or `1`        | toggle palette cycling        |
//! | `/pixli/sequence/next`   |                   | next scene in list order      |
//! | `/pixli/sequence/previous`|                  | previous scene in list order  |
//! | `/pixli/randomize`       |                   | randomize all parameters      |

use std::net::SocketAddr;
use std::sync::Arc;

use rosc::{OscMessage, OscPacket, OscType};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::animation::modes::MovementMode;
use crate::foundation::error::{PixliError, PixliResult};
use crate::protocol::{
    AdapterContext, ConnectionState, MessageHandler, ProtocolAdapter, ProtocolParseError,
    log_dropped, unix_millis,
};
use crate::state::delta::{Param, StateDelta};
use crate::state::model::BlendMode;
use crate::state::owner::DeltaSource;
use crate::state::scenes::PRESET_SLOTS;

pub const ADDRESS_PREFIX: &str = "/pixli";
const MAX_DATAGRAM: usize = 4096;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct OscSettings {
    pub enabled: bool,
    pub bind: SocketAddr,
    /// Where outbound feedback messages go, if anywhere.
    pub reply_to: Option<SocketAddr>,
}

impl Default for OscSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: SocketAddr::from(([0, 0, 0, 0], 9000)),
            reply_to: None,
        }
    }
}

fn parse_error(msg: &OscMessage, what: impl std::fmt::Display) -> ProtocolParseError {
    ProtocolParseError::new("osc", format!("{}: {what}", msg.addr))
}

fn number_arg(msg: &OscMessage) -> Result<f64, ProtocolParseError> {
    let v = match msg.args.first() {
        Some(OscType::Float(v)) => f64::from(*v),
        Some(OscType::Double(v)) => *v,
        Some(OscType::Int(v)) => f64::from(*v),
        Some(OscType::Long(v)) => *v as f64,
        Some(other) => return Err(parse_error(msg, format!("expected number, got {other:?}"))),
        None => return Err(parse_error(msg, "missing numeric argument")),
    };
    if !v.is_finite() {
        return Err(parse_error(msg, "non-finite argument"));
    }
    Ok(v)
}

fn unit_range_arg(msg: &OscMessage) -> Result<f64, ProtocolParseError> {
    let v = number_arg(msg)?;
    if !(0.0..=100.0).contains(&v) {
        return Err(parse_error(msg, format!("{v} outside [0, 100]")));
    }
    Ok(v)
}

fn string_arg(msg: &OscMessage) -> Result<&str, ProtocolParseError> {
    match msg.args.first() {
        Some(OscType::String(s)) if !s.is_empty() => Ok(s.as_str()),
        Some(other) => Err(parse_error(msg, format!("expected string, got {other:?}"))),
        None => Err(parse_error(msg, "missing string argument")),
    }
}

fn toggle_arg(msg: &OscMessage) -> Result<bool, ProtocolParseError> {
    match msg.args.first() {
        Some(OscType::Bool(b)) => Ok(*b),
        _ => match number_arg(msg)? {
            v if v == 0.0 => Ok(false),
            v if v == 1.0 => Ok(true),
            v => Err(parse_error(msg, format!("expected 0 or 1, got {v}"))),
        },
    }
}

/// Translate one OSC message into a delta.
pub fn message_to_delta(msg: &OscMessage) -> Result<StateDelta, ProtocolParseError> {
    let Some(path) = msg.addr.strip_prefix(ADDRESS_PREFIX) else {
        return Err(parse_error(msg, "outside the /pixli namespace"));
    };
    match path {
        "/preset/load" => match msg.args.first() {
            Some(OscType::String(_)) => Ok(StateDelta::LoadScene(string_arg(msg)?.to_owned())),
            _ => {
                let slot = number_arg(msg)?;
                if slot.fract() != 0.0 || slot < 1.0 || slot > f64::from(PRESET_SLOTS) {
                    return Err(parse_error(msg, format!("preset slot {slot} out of range")));
                }
                Ok(StateDelta::LoadPreset(slot as u8))
            }
        },
        "/motion/intensity" => Ok(StateDelta::Set(Param::MotionIntensity, unit_range_arg(msg)?)),
        "/motion/speed" => Ok(StateDelta::Set(Param::MotionSpeed, unit_range_arg(msg)?)),
        "/motion/mode" => {
            let name = string_arg(msg)?;
            MovementMode::parse(name)
                .map(StateDelta::MovementMode)
                .map_err(|e| parse_error(msg, e))
        }
        "/blend/mode" => {
            let name = string_arg(msg)?;
            BlendMode::parse(name)
                .map(StateDelta::BlendMode)
                .ok_or_else(|| parse_error(msg, format!("unknown blend mode '{name}'")))
        }
        "/palette/cycle" => Ok(StateDelta::PaletteCycling(toggle_arg(msg)?)),
        "/sequence/next" => Ok(StateDelta::SequenceNext),
        "/sequence/previous" => Ok(StateDelta::SequencePrevious),
        "/randomize" => Ok(StateDelta::RandomizeAll {
            nonce: unix_millis(),
        }),
        _ => Err(parse_error(msg, "unknown address")),
    }
}

/// Flatten bundles into their messages, depth first.
pub fn flatten_packet(packet: OscPacket, out: &mut Vec<OscMessage>) {
    match packet {
        OscPacket::Message(m) => out.push(m),
        OscPacket::Bundle(b) => {
            for p in b.content {
                flatten_packet(p, out);
            }
        }
    }
}

struct OscRouter {
    ctx: AdapterContext,
    handler: Option<MessageHandler<OscMessage>>,
}

impl OscRouter {
    /// Decode one datagram; each message in it is routed independently.
    fn route(&self, datagram: &[u8]) -> usize {
        let packet = match rosc::decoder::decode_udp(datagram) {
            Ok((_, packet)) => packet,
            Err(e) => {
                log_dropped(&ProtocolParseError::new("osc", format!("{e:?}")));
                return 0;
            }
        };
        let mut messages = Vec::new();
        flatten_packet(packet, &mut messages);
        let mut enqueued = 0;
        for msg in &messages {
            if let Some(handler) = &self.handler {
                handler(msg);
            }
            match message_to_delta(msg) {
                Ok(delta) => {
                    tracing::trace!(addr = %msg.addr, ?delta, "osc");
                    self.ctx.enqueue(DeltaSource::Osc, delta);
                    enqueued += 1;
                }
                Err(e) => log_dropped(&e),
            }
        }
        enqueued
    }
}

pub struct OscAdapter {
    ctx: AdapterContext,
    settings: OscSettings,
    handler: Option<MessageHandler<OscMessage>>,
    status: watch::Sender<ConnectionState>,
    socket: Option<Arc<UdpSocket>>,
    task: Option<JoinHandle<()>>,
}

impl OscAdapter {
    pub fn new(ctx: AdapterContext, settings: OscSettings) -> Self {
        Self {
            ctx,
            settings,
            handler: None,
            status: watch::Sender::new(ConnectionState::Disconnected),
            socket: None,
            task: None,
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Send one message to `reply_to`. A no-op when no reply address is set.
    pub async fn send(&self, msg: OscMessage) -> PixliResult<()> {
        let Some(target) = self.settings.reply_to else {
            return Ok(());
        };
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| PixliError::connection("osc adapter is not connected"))?;
        let bytes = rosc::encoder::encode(&OscPacket::Message(msg))
            .map_err(|e| PixliError::protocol(format!("osc encode: {e:?}")))?;
        socket
            .send_to(&bytes, target)
            .await
            .map_err(|e| PixliError::connection(format!("osc send to {target}: {e}")))?;
        Ok(())
    }

    /// Echo the current motion intensity to the control surface.
    pub async fn send_intensity(&self, value: f64) -> PixliResult<()> {
        self.send(OscMessage {
            addr: format!("{ADDRESS_PREFIX}/motion/intensity"),
            args: vec![OscType::Float(value as f32)],
        })
        .await
    }

    pub async fn send_scene(&self, scene_id: &str) -> PixliResult<()> {
        self.send(OscMessage {
            addr: format!("{ADDRESS_PREFIX}/scene/current"),
            args: vec![OscType::String(scene_id.to_owned())],
        })
        .await
    }
}

impl ProtocolAdapter for OscAdapter {
    type Settings = OscSettings;
    type Message = OscMessage;

    fn name(&self) -> &'static str {
        "osc"
    }

    async fn connect(&mut self) -> PixliResult<()> {
        if !self.settings.enabled {
            return Err(PixliError::connection("osc input is disabled"));
        }
        if self.status.borrow().is_connected() {
            return Ok(());
        }
        self.status.send_replace(ConnectionState::Connecting);
        let bind = self.settings.bind;
        let socket = match UdpSocket::bind(bind).await {
            Ok(s) => Arc::new(s),
            Err(e) => {
                self.status.send_replace(ConnectionState::Disconnected);
                return Err(PixliError::connection(format!("osc bind {bind}: {e}")));
            }
        };
        let router = OscRouter {
            ctx: self.ctx.clone(),
            handler: self.handler.clone(),
        };
        let rx = Arc::clone(&socket);
        let status = self.status.clone();
        self.task = Some(tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM];
            loop {
                match rx.recv_from(&mut buf).await {
                    Ok((n, _)) => {
                        router.route(&buf[..n]);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "osc socket closed");
                        status.send_replace(ConnectionState::Disconnected);
                        break;
                    }
                }
            }
        }));
        self.socket = Some(socket);
        tracing::info!(bind = ?self.local_addr(), "osc input connected");
        self.status.send_replace(ConnectionState::Connected);
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.socket = None;
        self.status.send_replace(ConnectionState::Disconnected);
    }

    fn on_message(&mut self, handler: MessageHandler<OscMessage>) {
        self.handler = Some(handler);
    }

    fn update_settings(&mut self, settings: OscSettings) {
        self.settings = settings;
    }

    fn connection_state(&self) -> ConnectionState {
        self.status.borrow().clone()
    }

    fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.status.subscribe()
    }
}

impl Drop for OscAdapter {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/protocol/osc.rs"]
mod tests;

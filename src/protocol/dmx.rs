//! DMX lighting output over Art-Net.
//!
//! Outbound only. Each call to [`DmxAdapter::send_state`] maps a fixed subset of
//! the generator state onto one universe:
//!
//! | channels | content                                        |
//! |----------|------------------------------------------------|
//! | 1..=24   | up to eight palette colors as RGB triplets     |
//! | 25       | motion intensity, `[0, 100]` scaled to `0..=255` |
//! | 26       | motion speed                                   |
//! | 27       | background brightness                          |

use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tokio::sync::watch;

use crate::foundation::core::Rgb8;
use crate::foundation::error::{PixliError, PixliResult};
use crate::protocol::{ConnectionState, MessageHandler, ProtocolAdapter};
use crate::state::model::GeneratorState;
use crate::state::palette::{Palette, hue_rotation_degrees};

pub const ARTNET_PORT: u16 = 6454;
pub const UNIVERSE_SIZE: usize = 512;
pub const PALETTE_SLOTS: usize = 8;
pub const CHANNEL_INTENSITY: usize = 25;
pub const CHANNEL_SPEED: usize = 26;
pub const CHANNEL_BACKGROUND: usize = 27;

const ARTNET_ID: &[u8; 8] = b"Art-Net\0";
const OP_DMX: u16 = 0x5000;
const PROTOCOL_VERSION: u16 = 14;
const HEADER_LEN: usize = 18;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct DmxSettings {
    pub enabled: bool,
    pub target: SocketAddr,
    /// 15-bit Port-Address (net, sub-net and universe).
    pub universe: u16,
}

impl Default for DmxSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            target: SocketAddr::from(([255, 255, 255, 255], ARTNET_PORT)),
            universe: 0,
        }
    }
}

/// One universe of channel levels; channel `n` is stored at index `n - 1`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DmxFrame {
    pub universe: u16,
    pub channels: [u8; UNIVERSE_SIZE],
}

impl DmxFrame {
    pub fn new(universe: u16) -> Self {
        Self {
            universe,
            channels: [0; UNIVERSE_SIZE],
        }
    }

    /// 1-based channel access.
    pub fn channel(&self, n: usize) -> u8 {
        n.checked_sub(1)
            .and_then(|i| self.channels.get(i))
            .copied()
            .unwrap_or(0)
    }

    fn set(&mut self, n: usize, value: u8) {
        if let Some(slot) = n.checked_sub(1).and_then(|i| self.channels.get_mut(i)) {
            *slot = value;
        }
    }
}

fn level(v: f64) -> u8 {
    (v.clamp(0.0, 100.0) / 100.0 * 255.0).round() as u8
}

/// Map state onto the fixed channel layout.
pub fn frame_from_state(
    state: &GeneratorState,
    palette: &Palette,
    universe: u16,
    elapsed_secs: f64,
) -> DmxFrame {
    let mut frame = DmxFrame::new(universe);
    let hue = hue_rotation_degrees(state, elapsed_secs);
    for (i, color) in palette.colors.iter().take(PALETTE_SLOTS).enumerate() {
        let Rgb8 { r, g, b } = color.hue_rotated(hue);
        frame.set(i * 3 + 1, r);
        frame.set(i * 3 + 2, g);
        frame.set(i * 3 + 3, b);
    }
    frame.set(CHANNEL_INTENSITY, level(state.motion_intensity));
    frame.set(CHANNEL_SPEED, level(state.motion_speed));
    frame.set(CHANNEL_BACKGROUND, level(state.background_brightness));
    frame
}

/// Encode an ArtDmx packet. `sequence` 0 disables receiver-side reordering.
pub fn encode_artdmx(frame: &DmxFrame, sequence: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + UNIVERSE_SIZE);
    out.extend_from_slice(ARTNET_ID);
    out.extend_from_slice(&OP_DMX.to_le_bytes());
    out.extend_from_slice(&PROTOCOL_VERSION.to_be_bytes());
    out.push(sequence);
    out.push(0);
    out.extend_from_slice(&(frame.universe & 0x7FFF).to_le_bytes());
    out.extend_from_slice(&(UNIVERSE_SIZE as u16).to_be_bytes());
    out.extend_from_slice(&frame.channels);
    out
}

/// Art-Net sequence numbers run 1..=255; 0 means "unsequenced".
fn next_sequence(current: u8) -> u8 {
    if current == u8::MAX { 1 } else { current + 1 }
}

pub struct DmxAdapter {
    settings: DmxSettings,
    handler: Option<MessageHandler<DmxFrame>>,
    status: watch::Sender<ConnectionState>,
    socket: Option<UdpSocket>,
    sequence: u8,
}

impl DmxAdapter {
    pub fn new(settings: DmxSettings) -> Self {
        Self {
            settings,
            handler: None,
            status: watch::Sender::new(ConnectionState::Disconnected),
            socket: None,
            sequence: 0,
        }
    }

    pub async fn send_frame(&mut self, frame: &DmxFrame) -> PixliResult<()> {
        let target = self.settings.target;
        let Some(socket) = &self.socket else {
            return Err(PixliError::connection("dmx output is not connected"));
        };
        let sequence = next_sequence(self.sequence);
        socket
            .send_to(&encode_artdmx(frame, sequence), target)
            .await
            .map_err(|e| PixliError::connection(format!("dmx send to {target}: {e}")))?;
        self.sequence = sequence;
        if let Some(handler) = &self.handler {
            handler(frame);
        }
        Ok(())
    }

    pub async fn send_state(
        &mut self,
        state: &GeneratorState,
        palette: &Palette,
        elapsed_secs: f64,
    ) -> PixliResult<()> {
        let frame = frame_from_state(state, palette, self.settings.universe, elapsed_secs);
        self.send_frame(&frame).await
    }
}

impl ProtocolAdapter for DmxAdapter {
    type Settings = DmxSettings;
    /// Observers see each frame after it was sent.
    type Message = DmxFrame;

    fn name(&self) -> &'static str {
        "dmx"
    }

    async fn connect(&mut self) -> PixliResult<()> {
        if !self.settings.enabled {
            return Err(PixliError::connection("dmx output is disabled"));
        }
        if self.socket.is_some() {
            return Ok(());
        }
        self.status.send_replace(ConnectionState::Connecting);
        let bind = if self.settings.target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = match UdpSocket::bind(bind).await {
            Ok(s) => s,
            Err(e) => {
                self.status.send_replace(ConnectionState::Disconnected);
                return Err(PixliError::connection(format!("dmx bind: {e}")));
            }
        };
        if let Err(e) = socket.set_broadcast(true) {
            tracing::debug!(error = %e, "dmx broadcast unavailable");
        }
        tracing::info!(addr = %self.settings.target, universe = self.settings.universe, "dmx output connected");
        self.socket = Some(socket);
        self.status.send_replace(ConnectionState::Connected);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.socket = None;
        self.status.send_replace(ConnectionState::Disconnected);
    }

    fn on_message(&mut self, handler: MessageHandler<DmxFrame>) {
        self.handler = Some(handler);
    }

    fn update_settings(&mut self, settings: DmxSettings) {
        self.settings = settings;
    }

    fn connection_state(&self) -> ConnectionState {
        self.status.borrow().clone()
    }

    fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.status.subscribe()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/protocol/dmx.rs"]
mod tests;

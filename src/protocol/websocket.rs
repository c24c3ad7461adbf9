//! WebSocket remote control.
//!
//! The engine dials a control server and exchanges JSON envelopes of the form
//! `{"type": "<kind>", ...fields, "timestamp": <unix ms>}`. Inbound kinds mutate
//! state through the fan-in queue or ask for a reply; outbound kinds report state
//! and the scene catalogue. An unexpected close triggers bounded reconnection.

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::foundation::error::{PixliError, PixliResult};
use crate::protocol::reconnect::{ReconnectPolicy, ReconnectSettings};
use crate::protocol::{
    AdapterContext, ConnectionState, MessageHandler, ProtocolAdapter, ProtocolParseError,
    log_dropped, unix_millis,
};
use crate::state::delta::StateDelta;
use crate::state::model::GeneratorState;
use crate::state::owner::{DeltaSource, StateSnapshot};
use crate::state::scenes::{PRESET_SLOTS, SceneSummary};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct WebSocketSettings {
    pub enabled: bool,
    pub url: String,
    /// Push a `state-update` after every frame that changed the state.
    pub broadcast_state: bool,
    /// Also answer with `current-preset` next to `current-scene`.
    pub legacy_preset_messages: bool,
    pub reconnect: ReconnectSettings,
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "ws://127.0.0.1:8080".to_owned(),
            broadcast_state: true,
            legacy_preset_messages: false,
            reconnect: ReconnectSettings::default(),
        }
    }
}

/// A preset reference is either a 1-based slot or a scene id.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum PresetRef {
    Slot(u8),
    Id(String),
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WsInbound {
    LoadScene {
        #[serde(rename = "sceneId")]
        scene_id: String,
    },
    LoadPreset {
        #[serde(rename = "presetId")]
        preset_id: PresetRef,
    },
    RandomizeAll,
    RequestState,
    RequestScenes,
    RequestPresets,
    PixliAppConnect,
    PixliAppDisconnect,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WsOutbound {
    StateUpdate {
        state: Box<GeneratorState>,
        version: u64,
    },
    SceneList {
        scenes: Vec<SceneSummary>,
    },
    PresetList {
        presets: Vec<SceneSummary>,
    },
    CurrentScene {
        #[serde(rename = "sceneId")]
        scene_id: Option<String>,
    },
    CurrentPreset {
        #[serde(rename = "presetId")]
        preset_id: Option<String>,
    },
}

impl WsOutbound {
    pub fn state_update(snapshot: &StateSnapshot) -> Self {
        Self::StateUpdate {
            state: Box::new((*snapshot.state).clone()),
            version: snapshot.version,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundEnvelope {
    pub message: WsInbound,
    pub timestamp: Option<u64>,
}

pub fn decode_inbound(text: &str) -> Result<InboundEnvelope, ProtocolParseError> {
    let err = |e: serde_json::Error| ProtocolParseError::new("websocket", e.to_string());
    let mut value: Value = serde_json::from_str(text).map_err(err)?;
    let Some(obj) = value.as_object_mut() else {
        return Err(ProtocolParseError::new("websocket", "envelope is not an object"));
    };
    let timestamp = obj.remove("timestamp").and_then(|t| t.as_u64());
    let message = serde_json::from_value(value).map_err(err)?;
    Ok(InboundEnvelope { message, timestamp })
}

pub fn encode_outbound(message: &WsOutbound, timestamp: u64) -> PixliResult<String> {
    let mut value = serde_json::to_value(message)?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert("timestamp".to_owned(), Value::from(timestamp));
    }
    Ok(serde_json::to_string(&value)?)
}

#[derive(Clone)]
struct WsRouter {
    ctx: AdapterContext,
    handler: Option<MessageHandler<WsInbound>>,
    legacy_preset_messages: bool,
}

impl WsRouter {
    fn presets(&self) -> Vec<SceneSummary> {
        (1..=PRESET_SLOTS)
            .filter_map(|slot| self.ctx.scenes.preset(slot))
            .collect()
    }

    fn current_scene(&self, snapshot: &StateSnapshot) -> Vec<WsOutbound> {
        let scene_id = snapshot.state.scene_id.clone();
        let mut out = vec![WsOutbound::CurrentScene {
            scene_id: scene_id.clone(),
        }];
        if self.legacy_preset_messages {
            out.push(WsOutbound::CurrentPreset {
                preset_id: scene_id,
            });
        }
        out
    }

    /// Handle one text frame; returns the replies to send back.
    fn handle_text(&self, text: &str) -> Vec<WsOutbound> {
        let envelope = match decode_inbound(text) {
            Ok(e) => e,
            Err(e) => {
                log_dropped(&e);
                return Vec::new();
            }
        };
        if let Some(handler) = &self.handler {
            handler(&envelope.message);
        }
        tracing::debug!(message = ?envelope.message, "websocket inbound");
        match envelope.message {
            WsInbound::LoadScene { scene_id } => {
                self.ctx
                    .enqueue(DeltaSource::WebSocket, StateDelta::LoadScene(scene_id));
                Vec::new()
            }
            WsInbound::LoadPreset { preset_id } => {
                let delta = match preset_id {
                    PresetRef::Slot(slot) => StateDelta::LoadPreset(slot),
                    PresetRef::Id(id) => StateDelta::LoadScene(id),
                };
                self.ctx.enqueue(DeltaSource::WebSocket, delta);
                Vec::new()
            }
            WsInbound::RandomizeAll => {
                let nonce = envelope.timestamp.unwrap_or_else(unix_millis);
                self.ctx
                    .enqueue(DeltaSource::WebSocket, StateDelta::RandomizeAll { nonce });
                Vec::new()
            }
            WsInbound::RequestState => vec![WsOutbound::state_update(&self.ctx.state.snapshot())],
            WsInbound::RequestScenes => vec![WsOutbound::SceneList {
                scenes: self.ctx.scenes.list(),
            }],
            WsInbound::RequestPresets => vec![WsOutbound::PresetList {
                presets: self.presets(),
            }],
            WsInbound::PixliAppConnect => {
                let snapshot = self.ctx.state.snapshot();
                let mut out = vec![WsOutbound::state_update(&snapshot)];
                out.extend(self.current_scene(&snapshot));
                out
            }
            WsInbound::PixliAppDisconnect => {
                tracing::info!("remote app disconnected");
                Vec::new()
            }
        }
    }
}

enum SessionEnd {
    /// The peer closed or the transport failed.
    Lost,
    /// The adapter dropped its outbound sender.
    Shutdown,
}

async fn session(
    ws: WsStream,
    router: &WsRouter,
    outbound: &mut mpsc::UnboundedReceiver<WsOutbound>,
    broadcast_state: bool,
) -> SessionEnd {
    let (mut write, mut read) = ws.split();
    let mut snapshots = router.ctx.state.subscribe();
    snapshots.borrow_and_update();
    let mut watching = broadcast_state;

    loop {
        let replies = tokio::select! {
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => router.handle_text(text.as_str()),
                Some(Ok(Message::Close(_))) | None => return SessionEnd::Lost,
                Some(Ok(_)) => Vec::new(),
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "websocket read failed");
                    return SessionEnd::Lost;
                }
            },
            out = outbound.recv() => match out {
                Some(message) => vec![message],
                None => return SessionEnd::Shutdown,
            },
            changed = snapshots.changed(), if watching => match changed {
                Ok(()) => {
                    let snapshot = snapshots.borrow_and_update().clone();
                    vec![WsOutbound::state_update(&snapshot)]
                }
                Err(_) => {
                    watching = false;
                    Vec::new()
                }
            },
        };

        for reply in replies {
            let text = match encode_outbound(&reply, unix_millis()) {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!(error = %e, "websocket encode failed");
                    continue;
                }
            };
            if let Err(e) = write.send(Message::Text(text.into())).await {
                tracing::warn!(error = %e, "websocket write failed");
                return SessionEnd::Lost;
            }
        }
    }
}

struct Connection {
    url: String,
    settings: WebSocketSettings,
    router: WsRouter,
    outbound: mpsc::UnboundedReceiver<WsOutbound>,
    status: watch::Sender<ConnectionState>,
}

impl Connection {
    async fn run(mut self, first: WsStream) {
        let mut policy = ReconnectPolicy::new(self.settings.reconnect);
        let mut stream = Some(first);
        loop {
            if let Some(ws) = stream.take() {
                policy.reset();
                self.status.send_replace(ConnectionState::Connected);
                match session(ws, &self.router, &mut self.outbound, self.settings.broadcast_state)
                    .await
                {
                    SessionEnd::Lost => tracing::warn!(url = %self.url, "websocket connection lost"),
                    SessionEnd::Shutdown => {
                        self.status.send_replace(ConnectionState::Disconnected);
                        return;
                    }
                }
            }

            let Some(delay) = policy.next_delay() else {
                tracing::error!(
                    url = %self.url,
                    attempts = policy.attempts(),
                    "websocket reconnection attempts exhausted"
                );
                self.status.send_replace(ConnectionState::GaveUp);
                return;
            };
            let attempt = policy.attempts();
            self.status
                .send_replace(ConnectionState::Reconnecting { attempt });
            tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "websocket reconnecting");
            tokio::time::sleep(delay).await;

            match connect_async(self.url.as_str()).await {
                Ok((ws, _)) => stream = Some(ws),
                Err(e) => tracing::warn!(attempt, error = %e, "websocket reconnect failed"),
            }
        }
    }
}

pub struct WebSocketAdapter {
    ctx: AdapterContext,
    settings: WebSocketSettings,
    handler: Option<MessageHandler<WsInbound>>,
    status: watch::Sender<ConnectionState>,
    outbound: Option<mpsc::UnboundedSender<WsOutbound>>,
    task: Option<JoinHandle<()>>,
}

impl WebSocketAdapter {
    pub fn new(ctx: AdapterContext, settings: WebSocketSettings) -> Self {
        Self {
            ctx,
            settings,
            handler: None,
            status: watch::Sender::new(ConnectionState::Disconnected),
            outbound: None,
            task: None,
        }
    }

    fn router(&self) -> WsRouter {
        WsRouter {
            ctx: self.ctx.clone(),
            handler: self.handler.clone(),
            legacy_preset_messages: self.settings.legacy_preset_messages,
        }
    }

    /// Queue a message for the current (or next) connection.
    pub fn send(&self, message: WsOutbound) -> PixliResult<()> {
        self.outbound
            .as_ref()
            .ok_or_else(|| PixliError::connection("websocket adapter is not connected"))?
            .send(message)
            .map_err(|_| PixliError::connection("websocket connection task has stopped"))
    }

    pub fn send_state(&self) -> PixliResult<()> {
        self.send(WsOutbound::state_update(&self.ctx.state.snapshot()))
    }

    pub fn send_scene_list(&self) -> PixliResult<()> {
        self.send(WsOutbound::SceneList {
            scenes: self.ctx.scenes.list(),
        })
    }

    pub fn send_current_scene(&self) -> PixliResult<()> {
        let router = self.router();
        for message in router.current_scene(&self.ctx.state.snapshot()) {
            self.send(message)?;
        }
        Ok(())
    }

    fn cancel_task(&mut self) {
        self.outbound = None;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl ProtocolAdapter for WebSocketAdapter {
    type Settings = WebSocketSettings;
    type Message = WsInbound;

    fn name(&self) -> &'static str {
        "websocket"
    }

    async fn connect(&mut self) -> PixliResult<()> {
        if !self.settings.enabled {
            return Err(PixliError::connection("websocket control is disabled"));
        }
        let active = matches!(
            *self.status.borrow(),
            ConnectionState::Connected | ConnectionState::Reconnecting { .. }
        );
        if active && self.task.is_some() {
            return Ok(());
        }
        self.cancel_task();
        self.status.send_replace(ConnectionState::Connecting);
        let url = self.settings.url.clone();
        let ws = match connect_async(url.as_str()).await {
            Ok((ws, _)) => ws,
            Err(e) => {
                self.status.send_replace(ConnectionState::Disconnected);
                return Err(PixliError::connection(format!("websocket {url}: {e}")));
            }
        };
        tracing::info!(url = %url, "websocket connected");

        let (tx, rx) = mpsc::unbounded_channel();
        let connection = Connection {
            url,
            settings: self.settings.clone(),
            router: self.router(),
            outbound: rx,
            status: self.status.clone(),
        };
        self.status.send_replace(ConnectionState::Connected);
        self.outbound = Some(tx);
        self.task = Some(tokio::spawn(connection.run(ws)));
        Ok(())
    }

    fn disconnect(&mut self) {
        self.cancel_task();
        self.status.send_replace(ConnectionState::Disconnected);
    }

    fn on_message(&mut self, handler: MessageHandler<WsInbound>) {
        self.handler = Some(handler);
    }

    fn update_settings(&mut self, settings: WebSocketSettings) {
        self.settings = settings;
    }

    fn connection_state(&self) -> ConnectionState {
        self.status.borrow().clone()
    }

    fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.status.subscribe()
    }
}

impl Drop for WebSocketAdapter {
    fn drop(&mut self) {
        self.cancel_task();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/protocol/websocket.rs"]
mod tests;

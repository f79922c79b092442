//! HTTP + WebSocket bridge for out-of-process games
//!
//! Endpoints:
//! - GET /health - Health check
//! - GET /status - Controller snapshot
//! - POST /scene - Report a scene load
//! - POST /line - Feed one raw glove line
//! - WS /ws - Live events and sink calls

use axum::{
    extract::{ws::{Message, WebSocket}, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

use crate::core::controller::{ControllerStatus, GloveController};
use crate::core::router::{GloveEventSink, SceneBindings, HELP_METHODS};
use crate::types::{EventOutput, Mode};

/// Frame period of the server-side update loop
const TICK: Duration = Duration::from_millis(16);

/// Message pushed to WebSocket clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeMessage {
    /// A decoded event
    Event(EventOutput),
    /// A sink method the game should run
    Call {
        method: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        arg: Option<serde_json::Value>,
    },
}

/// Sink that forwards every call to the WebSocket clients
///
/// Help and panel calls report success; the remote side decides what exists.
#[derive(Debug, Clone)]
pub struct BridgeSink {
    tx: broadcast::Sender<BridgeMessage>,
}

impl BridgeSink {
    pub fn new(tx: broadcast::Sender<BridgeMessage>) -> Self {
        Self { tx }
    }

    fn call(&self, method: &str, arg: Option<serde_json::Value>) {
        let _ = self.tx.send(BridgeMessage::Call {
            method: method.to_string(),
            arg,
        });
    }
}

impl GloveEventSink for BridgeSink {
    fn glove_move_left(&mut self) {
        self.call("GloveMoveLeft", None);
    }
    fn glove_move_right(&mut self) {
        self.call("GloveMoveRight", None);
    }
    fn glove_move_up(&mut self) {
        self.call("GloveMoveUp", None);
    }
    fn glove_move_down(&mut self) {
        self.call("GloveMoveDown", None);
    }
    fn glove_select_or_swap_arm(&mut self) {
        self.call("GloveSelectOrSwapArm", None);
    }
    fn glove_select(&mut self) {
        self.call("GloveSelect", None);
    }
    fn on_fist(&mut self) {
        self.call("OnFist", None);
    }
    fn spawn_rock(&mut self) {
        self.call("SpawnRock", None);
    }
    fn open_help(&mut self) -> bool {
        self.call(HELP_METHODS[0], Some(serde_json::json!(HELP_METHODS)));
        true
    }
    fn on_choice(&mut self, choice: u8) {
        self.call("OnChoice", Some(serde_json::json!(choice)));
    }
    fn snap_to_lane(&mut self, lane: usize) {
        self.call("SnapToLane", Some(serde_json::json!(lane)));
    }
    fn catch_at_player(&mut self, radius: f32) -> usize {
        self.call("CatchAtPlayer", Some(serde_json::json!(radius)));
        0
    }
    fn trigger_bite_flash(&mut self) {
        self.call("TriggerBiteFlash", None);
    }
    fn panel_next(&mut self) -> bool {
        self.call("OnRight", None);
        true
    }
    fn panel_prev(&mut self) -> bool {
        self.call("OnLeft", None);
        true
    }
}

/// App state
pub struct AppState {
    pub controller: Mutex<GloveController>,
    pub updates: broadcast::Sender<BridgeMessage>,
}

impl AppState {
    pub fn new(controller: GloveController) -> Arc<Self> {
        let (updates, _) = broadcast::channel(256);
        Arc::new(Self {
            controller: Mutex::new(controller),
            updates,
        })
    }

    /// Load a scene with the bridge sink as its target and publish the change
    pub async fn enter_scene(&self, scene: &str) -> EventOutput {
        let bindings = SceneBindings::with_sink(BridgeSink::new(self.updates.clone()));
        let output = self
            .controller
            .lock()
            .await
            .on_scene_changed(scene, bindings, Instant::now());
        self.publish(std::slice::from_ref(&output));
        output
    }

    fn publish(&self, events: &[EventOutput]) {
        for e in events {
            let _ = self.updates.send(BridgeMessage::Event(e.clone()));
        }
    }
}

/// Scene load request
#[derive(Debug, Deserialize)]
pub struct SceneRequest {
    pub scene: String,
}

/// Scene load response
#[derive(Debug, Serialize)]
pub struct SceneResponse {
    pub scene: String,
    pub mode: Mode,
    pub calls: Vec<String>,
}

/// Raw line request
#[derive(Debug, Deserialize)]
pub struct LineRequest {
    pub line: String,
}

/// Raw line response
#[derive(Debug, Serialize)]
pub struct LineResponse {
    pub accepted: bool,
    pub events: Vec<EventOutput>,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub mode: Mode,
    pub connected: bool,
}

/// Create the API router around a controller
pub fn create_router(controller: GloveController) -> Router {
    router_with_state(AppState::new(controller))
}

pub fn router_with_state(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/scene", post(change_scene))
        .route("/line", post(push_line))
        .route("/ws", get(websocket_handler))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let controller = state.controller.lock().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        mode: controller.mode(),
        connected: controller.is_connected(),
    })
}

async fn status(State(state): State<Arc<AppState>>) -> Json<ControllerStatus> {
    Json(state.controller.lock().await.status())
}

/// Scene load reported by the game; the bridge sink becomes the target
async fn change_scene(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SceneRequest>,
) -> Result<Json<SceneResponse>, StatusCode> {
    let scene = req.scene.trim();
    if scene.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let output = state.enter_scene(scene).await;

    Ok(Json(SceneResponse {
        scene: scene.to_string(),
        mode: output.mode,
        calls: output.calls,
    }))
}

/// Feed one raw line and run a frame right away
async fn push_line(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LineRequest>,
) -> Json<LineResponse> {
    let mut controller = state.controller.lock().await;
    let accepted = controller.inject_raw(&req.line);
    let events = if accepted {
        controller.update(Instant::now())
    } else {
        Vec::new()
    };
    drop(controller);

    state.publish(&events);
    Json(LineResponse { accepted, events })
}

/// WebSocket handler for live updates
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let rx = state.updates.subscribe();
    ws.on_upgrade(move |socket| async move {
        handle_websocket(socket, rx).await;
    })
}

/// Handle WebSocket connection; ends when either side closes
async fn handle_websocket(socket: WebSocket, mut rx: broadcast::Receiver<BridgeMessage>) {
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(msg) => {
                    let json = serde_json::to_string(&msg).unwrap_or_default();
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!("[WS] client lagged, skipped {}", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}

/// Run the controller at frame rate and publish what it emits
async fn tick_loop(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(TICK);
    loop {
        interval.tick().await;
        let events = state.controller.lock().await.update(Instant::now());
        state.publish(&events);
    }
}

/// Run the API server, starting in `scene` until the game reports its own
pub async fn run_server(
    addr: &str,
    controller: GloveController,
    scene: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::new(controller);
    state.enter_scene(scene).await;
    tokio::spawn(tick_loop(Arc::clone(&state)));

    let router = router_with_state(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("gloveline bridge running on {}", addr);
    println!("🧤 gloveline bridge running on {}", addr);
    println!("  GET  /health  - Health check");
    println!("  GET  /status  - Controller snapshot");
    println!("  POST /scene   - Report scene load");
    println!("  POST /line    - Feed a raw glove line");
    println!("  WS   /ws      - Live events and sink calls");
    axum::serve(listener, router).await?;
    Ok(())
}

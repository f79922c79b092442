//! Core modules for gloveline

pub mod line_parser;
pub mod pose;
pub mod gesture;
pub mod router;
pub mod feedback;
pub mod serial;
pub mod controller;
pub mod api;

pub use line_parser::LineParser;
pub use pose::{PoseClassifier, PosePhase, PoseTracker};
pub use gesture::{FingerGestureEngine, GestureSignal, GestureSnapshot};
pub use router::{dispatch_table, feedback_for, GloveEventSink, GloveRouter, PageFlow, SceneBindings, SinkCall, HELP_METHODS};
pub use feedback::{format_sequence_command, FeedbackChannel, FeedbackWriter, NullWriter, RecordingWriter};
pub use serial::{list_ports, pick_port, platform_port_name, LineAssembler, SerialFeedbackWriter, SerialLink, SerialSettings};
pub use controller::{ControllerStatus, GloveController};
pub use api::{create_router, router_with_state, run_server, AppState, BridgeMessage, BridgeSink};

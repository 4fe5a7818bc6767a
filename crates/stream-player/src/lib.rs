//! Adaptive-streaming playback engine.
//!
//! Three actors cooperate through message passing:
//! - download: paced byte-range or live pulls ([`download`])
//! - decode: a session against the external decode service ([`decode`])
//! - player: state machines, frame buffer and AV sync ([`player`], [`runtime`])

pub mod audio;
pub mod config;
pub mod decode;
pub mod download;
pub mod error;
pub mod frame_buffer;
pub mod player;
pub mod runtime;
pub mod seek;
pub mod sinks;
pub mod timer;

pub use config::PlayerConfig;
pub use error::{ControlError, play_result};
pub use player::{PlayRequest, Player};
pub use runtime::{AudioFactory, PlayerHandle, PlayerLinks, launch, spawn_player};
pub use sinks::{LoadingIndicator, PlaneLayout, PlayCallback, ProgressControl, VideoSink, format_time};

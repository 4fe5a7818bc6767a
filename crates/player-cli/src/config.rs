use std::time::Duration;

use stream_player::PlayerConfig;

use crate::cli::Args;

/// Engine tuning derived from command-line flags.
pub fn player_config(args: &Args) -> PlayerConfig {
    PlayerConfig {
        chunk_size: args.chunk_size.max(1),
        max_buffer_seconds: args.buffer_seconds.max(0.1),
        render_interval: PlayerConfig::render_interval_for_fps(args.render_fps),
        decoder_url: args.decoder_url.clone(),
        http_timeout: Duration::from_secs(args.http_timeout_secs.max(1)),
        ..PlayerConfig::default()
    }
}

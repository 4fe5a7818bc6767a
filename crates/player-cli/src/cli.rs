use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "stream-play", version)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Option<Command>,

    /// List output devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Use a specific output device by substring match
    #[arg(long)]
    pub device: Option<String>,

    /// Bytes per range request (and per live slice)
    #[arg(long, default_value_t = 65_536)]
    pub chunk_size: u64,

    /// Decoded frames kept ahead of presentation, in seconds
    #[arg(long, default_value_t = 1.0)]
    pub buffer_seconds: f64,

    /// Render refresh rate driving AV sync
    #[arg(long, default_value_t = 60)]
    pub render_fps: u32,

    /// Decode service endpoint
    #[arg(long, default_value = stream_player::config::DEFAULT_DECODER_URL)]
    pub decoder_url: String,

    /// HTTP timeout for size probes and range fetches, in seconds
    #[arg(long, default_value_t = 10)]
    pub http_timeout_secs: u64,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Play a media URL (http://, https://, ws:// or wss://)
    Play {
        url: String,

        /// Treat the source as a live stream (no size, no seeking)
        #[arg(long)]
        live: bool,

        /// The stream carries no audio track; present against a wall clock
        #[arg(long)]
        no_audio: bool,

        /// Bytes to buffer before opening the decoder (0 = default)
        #[arg(long, default_value_t = 0)]
        header_wait: u64,

        /// Seek to this position (ms) once playback is running
        #[arg(long)]
        seek_ms: Option<u64>,

        /// Delay before the seek, in seconds
        #[arg(long, default_value_t = 3)]
        seek_after_secs: u64,
    },
}

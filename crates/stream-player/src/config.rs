use std::time::Duration;

/// Default decode-service endpoint.
pub const DEFAULT_DECODER_URL: &str = "ws://localhost:9002/decode";

/// Tuning parameters for the player engine and its actors.
#[derive(Clone, Debug)]
pub struct PlayerConfig {
    /// Bytes per chunk request and per live slice.
    pub chunk_size: u64,
    /// Header threshold used when `play()` passes 0.
    pub default_header_wait_bytes: u64,
    /// Frame buffer ceiling in seconds.
    pub max_buffer_seconds: f64,
    /// Target throughput as a multiple of the measured byte rate.
    pub download_speed_coef: f64,
    /// Pacing used before the byte rate is known.
    pub default_chunk_interval: Duration,
    /// Seek prebuffer target used before the byte rate is known.
    pub default_seek_wait_bytes: u64,
    /// Interval hint passed to `start` (0 while a seek is urgent).
    pub decode_interval_ms: u32,
    pub track_interval: Duration,
    /// Render-refresh cadence driving the AV sync loop.
    pub render_interval: Duration,
    pub frames_per_tick: usize,
    /// Total `init` attempts while the decode service is not reachable.
    pub init_retries: u32,
    pub init_backoff: Duration,
    pub accurate_seek: bool,
    pub decoder_url: String,
    /// Per-request timeout for range fetches and size probes.
    pub http_timeout: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 65_536,
            default_header_wait_bytes: 524_288,
            max_buffer_seconds: 1.0,
            download_speed_coef: 2.0,
            default_chunk_interval: Duration::from_millis(200),
            default_seek_wait_bytes: 524_288,
            decode_interval_ms: 5,
            track_interval: Duration::from_millis(500),
            render_interval: Duration::from_millis(16),
            frames_per_tick: 2,
            init_retries: 5,
            init_backoff: Duration::from_millis(100),
            accurate_seek: true,
            decoder_url: DEFAULT_DECODER_URL.to_string(),
            http_timeout: Duration::from_secs(10),
        }
    }
}

impl PlayerConfig {
    /// Render cadence for a refresh rate in frames per second.
    pub fn render_interval_for_fps(fps: u32) -> Duration {
        let fps = fps.clamp(1, 1000);
        Duration::from_micros(1_000_000 / u64::from(fps))
    }
}

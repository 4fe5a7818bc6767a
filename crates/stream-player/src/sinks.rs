//! Render-side collaborators owned by the player.

use stream_player_proto::StreamInfo;
use stream_player_types::PlayerNotice;

/// Receives decoded planar YUV frames.
pub trait VideoSink: Send {
    /// Present `frame` (Y, U and V planes back to back) and return `true`, or
    /// return `false` to have it retried on a later tick.
    fn display(&mut self, frame: &[u8], layout: PlaneLayout) -> bool;

    fn fullscreen(&mut self) {}
}

/// Progress bar and time label.
pub trait ProgressControl: Send {
    fn set_range(&mut self, min_ms: u64, max_ms: u64);
    fn set_position(&mut self, ms: u64);
    fn set_label(&mut self, text: &str);
}

/// Buffering spinner.
pub trait LoadingIndicator: Send {
    fn show(&mut self);
    fn hide(&mut self);
}

/// Callback registered by `play()`.
pub type PlayCallback = Box<dyn FnMut(PlayerNotice) + Send>;

/// Plane sizes of one I420 frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaneLayout {
    pub width: u32,
    pub height: u32,
    pub y_len: usize,
    pub uv_len: usize,
}

impl PlaneLayout {
    pub fn new(width: u32, height: u32) -> Self {
        let w = width as usize;
        let h = height as usize;
        Self {
            width,
            height,
            y_len: w * h,
            uv_len: (w / 2) * (h / 2),
        }
    }

    pub fn from_info(info: &StreamInfo) -> Self {
        Self::new(info.width, info.height)
    }

    pub fn frame_len(&self) -> usize {
        self.y_len + 2 * self.uv_len
    }
}

/// `HH:MM:SS` for a position in seconds.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{:02}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_time_pads_fields() {
        assert_eq!(format_time(0.0), "00:00:00");
        assert_eq!(format_time(59.9), "00:00:59");
        assert_eq!(format_time(3_725.0), "01:02:05");
        assert_eq!(format_time(-3.0), "00:00:00");
    }

    #[test]
    fn plane_layout_for_i420() {
        let layout = PlaneLayout::new(640, 360);
        assert_eq!(layout.y_len, 230_400);
        assert_eq!(layout.uv_len, 57_600);
        assert_eq!(layout.frame_len(), 345_600);
    }
}

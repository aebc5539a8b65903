//! Frame scheduling
//!
//! The scene never talks to the host's animation loop directly. It asks a
//! [`Clock`] for the next frame and cancels through it, so tests can step
//! frames by hand.

/// Pending frame callback id, as handed out by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRequest(pub i32);

/// Host animation clock
pub trait Clock {
    /// Schedule one frame callback; `None` if the host refused
    fn request_frame(&mut self) -> Option<FrameRequest>;
    /// Drop a pending callback so it never fires
    fn cancel_frame(&mut self, request: FrameRequest);
}

/// Clock stepped by hand
///
/// Keeps at most one pending request. The owner fires it by calling
/// [`ManualClock::take_pending`] and then the scene's frame handler.
#[derive(Debug, Default)]
pub struct ManualClock {
    next_id: i32,
    pending: Option<FrameRequest>,
    /// Total requests ever made
    pub requested: u32,
    /// Total cancellations
    pub cancelled: u32,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<FrameRequest> {
        self.pending
    }

    pub fn take_pending(&mut self) -> Option<FrameRequest> {
        self.pending.take()
    }
}

impl Clock for ManualClock {
    fn request_frame(&mut self) -> Option<FrameRequest> {
        self.next_id += 1;
        self.requested += 1;
        let request = FrameRequest(self.next_id);
        self.pending = Some(request);
        Some(request)
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        if self.pending == Some(request) {
            self.pending = None;
        }
        self.cancelled += 1;
    }
}

/// Frame-time bookkeeping: last timestamp and a one-second FPS window
#[derive(Debug, Clone)]
pub struct FrameTimer {
    last_time: Option<f64>,
    frame_times: [f64; 60],
    frame_index: usize,
    fps: u32,
    frames: u64,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self {
            last_time: None,
            frame_times: [0.0; 60],
            frame_index: 0,
            fps: 0,
            frames: 0,
        }
    }
}

impl FrameTimer {
    /// Record a frame timestamp (ms); returns the elapsed ms since the last one
    pub fn record(&mut self, time: f64) -> f64 {
        let elapsed = self.last_time.map_or(0.0, |last| (time - last).max(0.0));
        self.last_time = Some(time);
        self.frames += 1;

        self.frame_times[self.frame_index] = time;
        self.frame_index = (self.frame_index + 1) % self.frame_times.len();

        // Oldest sample is the slot about to be overwritten
        let oldest = self.frame_times[self.frame_index];
        if self.frames >= self.frame_times.len() as u64 {
            let window = time - oldest;
            if window > 0.0 {
                self.fps = (60_000.0 / window).round() as u32;
            }
        }
        elapsed
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

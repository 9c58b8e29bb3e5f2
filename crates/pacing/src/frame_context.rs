/// Timing and animation results handed from the timing stage to the render
/// stage within one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameContext {
    /// Delay slept after this frame, in seconds.
    pub frame_delay_sec: f64,
    pub animation_duration_sec: f64,
    /// Bar position in `[0, 2)`.
    pub position: f32,
    /// Clock time sampled at the start of the frame.
    pub time_sec: f64,
    /// Time since the previous frame started.
    pub delta_sec: f64,
}

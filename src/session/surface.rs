//! Collaborator traits for the video input path.
//!
//! The video encoder never touches pixels itself. It owns a drawable input
//! surface handed out by the codec session, and drives an externally supplied
//! renderer against it once per frame. Swapping the surface submits the
//! rendered frame straight to the hardware encoder without an intermediate
//! copy.

use std::time::Duration;

use super::SessionError;

/// An encoder-owned rendering target.
///
/// Owned by the render thread for the lifetime of the encoding session;
/// dropped only after the render loop has fully exited.
pub trait InputSurface: Send {
    /// Stamp the next swapped buffer with a presentation time, in
    /// nanoseconds.
    fn set_presentation_time(&mut self, pts_ns: i64);

    /// Submit the currently drawn buffer to the codec session.
    fn swap_buffers(&mut self) -> Result<(), SessionError>;
}

/// The on-screen GPU texture renderer, supplied by the caller.
///
/// Invoked once per render-thread frame. All calls happen on the render
/// thread, in the order `attach`, `on_size_changed`, `draw`*, `detach`.
pub trait SurfaceRenderer: Send {
    /// The drawing context against the encoder's input surface is
    /// established; the renderer may allocate GPU resources.
    fn attach(&mut self);

    /// Reported once after `attach` with the encode dimensions.
    fn on_size_changed(&mut self, width: u32, height: u32);

    /// Paint one frame onto the current surface.
    fn draw(&mut self);

    /// The render loop has exited; release GPU resources. Never called
    /// concurrently with `draw`.
    fn detach(&mut self);
}

/// Per-frame render budget for a given frame rate.
#[inline]
pub(crate) fn frame_interval(frame_rate: u32) -> Duration {
    Duration::from_nanos(1_000_000_000 / u64::from(frame_rate.max(1)))
}

//! Two-thread surface video encoder.
//!
//! A render thread paints frames onto the encoder-owned input surface at a
//! fixed cadence; an encode thread drains the codec session's output queue
//! and forwards encoded access units to the callback. The two threads share
//! nothing but a pause/stop monitor and the session mutex: the GPU context
//! belongs to the render thread, the session's output side to the encode
//! thread, and the input side is implicit through the surface.
//!
//! Shutdown is ordered: `stop` wakes any paused thread, signals end-of-stream
//! to the codec, joins the render thread (no more frames submitted), then
//! joins the encode thread, which drains until it observes the end-of-stream
//! unit and performs the codec teardown itself.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, Receiver, Sender};
use tracing::{debug, info, trace, warn};

use crate::session::surface::frame_interval;
use crate::session::{
    CodecSession, DequeueEvent, InputSurface, SessionError, SessionFormat, SurfaceRenderer,
};

use super::error::EncoderResult;
use super::{Encoder, EncoderCallback, EncoderState, VideoEncoderConfig};

/// How long one dequeue attempt may wait before the loop re-checks flags.
const DEQUEUE_TIMEOUT: Duration = Duration::from_millis(10);

/// Pause/stop flags shared by both worker threads.
///
/// All mutation happens under the one mutex, and every waiter re-checks the
/// flags after waking, so spurious wakeups and missed notifications are both
/// impossible.
struct Monitor {
    flags: Mutex<Flags>,
    cond: Condvar,
}

#[derive(Default)]
struct Flags {
    running: bool,
    paused: bool,
    /// No end-of-stream unit will ever arrive; the drain must give up
    /// instead of waiting for one.
    drain_aborted: bool,
}

impl Monitor {
    fn new() -> Self {
        Self {
            flags: Mutex::new(Flags::default()),
            cond: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Flags> {
        // A poisoned monitor only means a worker panicked; the flags stay
        // coherent for shutdown.
        self.flags.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_running(&self) {
        let mut flags = self.lock();
        flags.running = true;
        flags.paused = false;
        flags.drain_aborted = false;
    }

    fn set_paused(&self, paused: bool) {
        let mut flags = self.lock();
        flags.paused = paused;
        if !paused {
            self.cond.notify_all();
        }
    }

    /// Flip both flags for shutdown and wake every waiter, so that a paused
    /// stop cannot deadlock.
    fn request_stop(&self) {
        let mut flags = self.lock();
        flags.running = false;
        flags.paused = false;
        self.cond.notify_all();
    }

    /// Called when end-of-stream could not be signaled: the encode thread
    /// must stop waiting for a unit that will never come.
    fn abort_drain(&self) {
        let mut flags = self.lock();
        flags.drain_aborted = true;
        self.cond.notify_all();
    }

    fn drain_aborted(&self) -> bool {
        self.lock().drain_aborted
    }

    /// Block while paused. Returns the current `running` flag.
    fn await_resumed(&self) -> bool {
        let mut flags = self.lock();
        while flags.paused && flags.running {
            flags = self
                .cond
                .wait(flags)
                .unwrap_or_else(|e| e.into_inner());
        }
        flags.running
    }
}

/// GPU-fed hardware video encoder.
///
/// `prepare` configures the session and claims the input surface; `start`
/// spawns the worker threads; `pause`/`resume` freeze and resume progress
/// without tearing anything down; `stop` drains and releases everything and
/// is safe to call twice.
pub struct SurfaceVideoEncoder {
    session: Arc<Mutex<Box<dyn CodecSession>>>,
    config: VideoEncoderConfig,
    state: EncoderState,
    monitor: Arc<Monitor>,
    session_open: bool,
    started: bool,
    /// Claimed at `prepare`, moved into the render thread at `start`.
    surface: Option<Box<dyn InputSurface>>,
    renderer: Option<Box<dyn SurfaceRenderer>>,
    render_handle: Option<JoinHandle<()>>,
    encode_handle: Option<JoinHandle<()>>,
    fault_tx: Sender<SessionError>,
    fault_rx: Receiver<SessionError>,
}

impl SurfaceVideoEncoder {
    /// Create an encoder around an unconfigured codec session and the
    /// caller's texture renderer.
    pub fn new(
        session: Box<dyn CodecSession>,
        renderer: Box<dyn SurfaceRenderer>,
        config: VideoEncoderConfig,
    ) -> Self {
        let (fault_tx, fault_rx) = bounded(2);
        Self {
            session: Arc::new(Mutex::new(session)),
            config,
            state: EncoderState::Idle,
            monitor: Arc::new(Monitor::new()),
            session_open: false,
            started: false,
            surface: None,
            renderer: Some(renderer),
            render_handle: None,
            encode_handle: None,
            fault_tx,
            fault_rx,
        }
    }

    /// Configure the session for surface input and claim the drawable
    /// surface. Threads are constructed lazily by [`start`](Self::start).
    pub fn prepare(&mut self) -> EncoderResult<()> {
        if self.state != EncoderState::Idle {
            return Ok(());
        }
        let cfg = &self.config;
        let format = SessionFormat::Video {
            width: cfg.width,
            height: cfg.height,
            frame_rate: cfg.frame_rate,
            bitrate: cfg.effective_bitrate(),
            keyframe_interval_secs: cfg.effective_keyframe_interval_secs(),
        };

        let surface = {
            let mut session = lock_session(&self.session);
            session.configure(&format)?;
            self.session_open = true;
            let surface = session.create_input_surface()?;
            session.start()?;
            surface
        };

        self.surface = Some(surface);
        info!(
            width = cfg.width,
            height = cfg.height,
            frame_rate = cfg.frame_rate,
            bitrate = cfg.effective_bitrate(),
            "video encoder prepared"
        );
        self.state = EncoderState::Prepared;
        Ok(())
    }

    /// Start both worker threads. No-op unless prepared.
    pub fn start(&mut self) {
        if self.state != EncoderState::Prepared {
            return;
        }
        let (Some(surface), Some(renderer)) = (self.surface.take(), self.renderer.take()) else {
            return;
        };

        self.monitor.set_running();

        let monitor = self.monitor.clone();
        let fault_tx = self.fault_tx.clone();
        let (width, height, frame_rate) = (self.config.width, self.config.height, self.config.frame_rate);
        self.render_handle = Some(thread::spawn(move || {
            render_loop(surface, renderer, monitor, width, height, frame_rate, fault_tx)
        }));

        let session = self.session.clone();
        let monitor = self.monitor.clone();
        let callback = self.config.callback.clone();
        self.encode_handle = Some(thread::spawn(move || encode_loop(session, monitor, callback)));

        self.started = true;
        self.state = EncoderState::Running;
        info!("video encoder started");
    }

    /// Freeze progress: no frames rendered, no encoding attempted, threads
    /// and session kept alive. Avoids the cost of a full re-`prepare` for a
    /// user-facing pause.
    pub fn pause(&mut self) {
        if self.state != EncoderState::Running {
            return;
        }
        self.monitor.set_paused(true);
        self.state = EncoderState::Paused;
        debug!("video encoder paused");
    }

    /// Wake any thread blocked on the monitor and resume progress.
    pub fn resume(&mut self) {
        if self.state != EncoderState::Paused {
            return;
        }
        self.monitor.set_paused(false);
        self.state = EncoderState::Running;
        debug!("video encoder resumed");
    }

    /// Drain and tear everything down.
    ///
    /// Blocks until both threads have exited; the encode thread performs the
    /// codec flush/stop/release on its way out. Idempotent: a second call
    /// after the threads have exited is a no-op.
    pub fn stop(&mut self) {
        if self.state == EncoderState::Released {
            return;
        }
        self.state = EncoderState::Stopping;
        self.monitor.request_stop();

        if self.session_open {
            let eos_signaled = {
                let mut session = lock_session(&self.session);
                match session.signal_end_of_stream() {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(error = %e, "failed to signal end of stream");
                        false
                    }
                }
            };
            if !eos_signaled {
                self.monitor.abort_drain();
            }
        }

        // Render thread first: no further frames may reach the codec while
        // the encode thread drains toward the end-of-stream unit.
        if let Some(handle) = self.render_handle.take() {
            if handle.join().is_err() {
                warn!("render thread panicked");
            }
        }
        if let Some(handle) = self.encode_handle.take() {
            if handle.join().is_err() {
                warn!("encode thread panicked");
            }
        }

        // Prepared but never started: nobody else will release the codec.
        if self.session_open && !self.started {
            let mut session = lock_session(&self.session);
            teardown(&mut **session);
        }
        self.session_open = false;

        while let Ok(fault) = self.fault_rx.try_recv() {
            warn!(error = %fault, "worker thread reported a fault");
        }

        info!("video encoder stopped");
        self.state = EncoderState::Released;
    }
}

impl Encoder for SurfaceVideoEncoder {
    fn prepare(&mut self) -> EncoderResult<()> {
        SurfaceVideoEncoder::prepare(self)
    }

    fn state(&self) -> EncoderState {
        self.state
    }

    fn stop(&mut self) {
        SurfaceVideoEncoder::stop(self)
    }
}

impl Drop for SurfaceVideoEncoder {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock_session<'a>(
    session: &'a Arc<Mutex<Box<dyn CodecSession>>>,
) -> MutexGuard<'a, Box<dyn CodecSession>> {
    session.lock().unwrap_or_else(|e| e.into_inner())
}

/// Attempt every teardown step even when an earlier one fails.
fn teardown(session: &mut dyn CodecSession) {
    if let Err(e) = session.flush() {
        warn!(error = %e, "session flush failed during stop");
    }
    if let Err(e) = session.stop() {
        warn!(error = %e, "session stop failed");
    }
    if let Err(e) = session.release() {
        warn!(error = %e, "session release failed");
    }
}

/// Produce frames at the configured cadence until stopped.
fn render_loop(
    mut surface: Box<dyn InputSurface>,
    mut renderer: Box<dyn SurfaceRenderer>,
    monitor: Arc<Monitor>,
    width: u32,
    height: u32,
    frame_rate: u32,
    fault_tx: Sender<SessionError>,
) {
    renderer.attach();
    renderer.on_size_changed(width, height);

    let interval = frame_interval(frame_rate);
    let interval_ns = interval.as_nanos() as i64;
    let mut next_pts_ns: i64 = 0;

    while monitor.await_resumed() {
        let frame_start = Instant::now();

        renderer.draw();
        surface.set_presentation_time(next_pts_ns);
        if let Err(e) = surface.swap_buffers() {
            warn!(error = %e, "buffer swap failed, render loop exiting");
            let _ = fault_tx.try_send(e);
            break;
        }
        next_pts_ns += interval_ns;
        trace!(next_pts_ns, "frame submitted");

        let elapsed = frame_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }

    // Strictly after the loop: the GPU context must never be torn down
    // concurrently with a draw call.
    renderer.detach();
    debug!("render loop exited");
}

/// Drain the session's output queue until the end-of-stream unit arrives,
/// then tear the session down.
fn encode_loop(
    session: Arc<Mutex<Box<dyn CodecSession>>>,
    monitor: Arc<Monitor>,
    callback: Arc<dyn EncoderCallback>,
) {
    let mut format_reported = false;

    loop {
        let running = monitor.await_resumed();
        if monitor.drain_aborted() {
            debug!("drain aborted, no end-of-stream unit expected");
            break;
        }

        let event = {
            let mut guard = lock_session(&session);
            guard.dequeue_output(DEQUEUE_TIMEOUT)
        };
        match event {
            // Transient conditions are control flow, retried silently.
            Ok(DequeueEvent::TryAgain) | Ok(DequeueEvent::BuffersChanged) => continue,
            Ok(DequeueEvent::FormatChanged(format)) => {
                if !format_reported {
                    format_reported = true;
                    callback.on_format_changed(&format);
                }
            }
            Ok(DequeueEvent::Unit(handle)) => {
                if handle.meta.is_end_of_stream() {
                    lock_session(&session).release_unit(handle);
                    break;
                }
                let meta = handle.meta;
                // Copy out under the lock; the codec buffer's content is
                // invalid after release.
                let data = {
                    let mut guard = lock_session(&session);
                    let bytes =
                        guard.unit_data(&handle)[meta.offset..meta.offset + meta.size].to_vec();
                    guard.release_unit(handle);
                    bytes
                };
                callback.on_data_encoded(&data, &meta);
            }
            Err(e) => {
                // Transient while running; once shutdown has begun a
                // faulted session cannot deliver the end-of-stream unit,
                // so the drain must not wait for it.
                if running {
                    trace!(error = %e, "dequeue failed, retrying");
                    continue;
                }
                warn!(error = %e, "dequeue failed during drain, giving up");
                break;
            }
        }
    }

    let mut guard = lock_session(&session);
    teardown(&mut **guard);
    debug!("encode loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monitor_blocks_while_paused_and_wakes_on_stop() {
        let monitor = Arc::new(Monitor::new());
        monitor.set_running();
        monitor.set_paused(true);

        let waiter = monitor.clone();
        let handle = thread::spawn(move || waiter.await_resumed());

        // Give the waiter time to park, then order shutdown.
        thread::sleep(Duration::from_millis(20));
        monitor.request_stop();
        assert!(!handle.join().unwrap());
    }

    #[test]
    fn drain_abort_is_independent_of_stop() {
        let monitor = Monitor::new();
        monitor.set_running();
        monitor.request_stop();
        assert!(!monitor.drain_aborted());
        monitor.abort_drain();
        assert!(monitor.drain_aborted());
    }

    #[test]
    fn monitor_resume_reports_still_running() {
        let monitor = Arc::new(Monitor::new());
        monitor.set_running();
        monitor.set_paused(true);

        let waiter = monitor.clone();
        let handle = thread::spawn(move || waiter.await_resumed());

        thread::sleep(Duration::from_millis(20));
        monitor.set_paused(false);
        assert!(handle.join().unwrap());
    }
}

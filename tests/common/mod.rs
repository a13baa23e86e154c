//! Scripted test doubles for the codec session and its collaborators.

// Each integration test binary compiles its own copy of this module and
// uses a different subset of it.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hwenc::session::{
    unit_flag, CodecSession, DequeueEvent, FormatDescriptor, InputSurface, SessionError,
    SessionFormat, SessionResult, SurfaceRenderer, UnitHandle, UnitMeta,
};
use hwenc::EncoderCallback;

/// Route encoder logs into the test harness, honoring `RUST_LOG`.
pub fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Everything a test wants to assert about session usage.
#[derive(Default)]
pub struct SessionLog {
    pub configured: Vec<SessionFormat>,
    pub start_calls: usize,
    pub flush_calls: usize,
    pub stop_calls: usize,
    pub release_calls: usize,
    pub eos_signals: usize,
    /// `(len, pts_us)` for every accepted input chunk.
    pub queued: Vec<(usize, i64)>,
    pub released_units: Vec<usize>,
    pub swap_count: usize,
    pub presentation_times_ns: Vec<i64>,
}

/// A codec session that replays a prerecorded dequeue script.
///
/// Once the script is exhausted the session reports `TryAgain` until
/// end-of-stream has been signaled, after which it yields a single
/// end-of-stream unit. That mirrors how a real encoder drains.
pub struct MockSession {
    log: Arc<Mutex<SessionLog>>,
    script: VecDeque<DequeueEvent>,
    buffers: Vec<Vec<u8>>,
    eos_delivered: bool,
    configure_fails: bool,
    eos_signal_fails: bool,
    dequeue_fails: bool,
}

impl MockSession {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(SessionLog::default())),
            script: VecDeque::new(),
            buffers: Vec::new(),
            eos_delivered: false,
            configure_fails: false,
            eos_signal_fails: false,
            dequeue_fails: false,
        }
    }

    /// Make `configure` fail, as a codec device rejecting the format would.
    pub fn with_configure_error(mut self) -> Self {
        self.configure_fails = true;
        self
    }

    /// Simulate a faulted device: end-of-stream cannot be signaled and
    /// every dequeue attempt errors.
    pub fn with_device_fault(mut self) -> Self {
        self.eos_signal_fails = true;
        self.dequeue_fails = true;
        self
    }

    pub fn log(&self) -> Arc<Mutex<SessionLog>> {
        self.log.clone()
    }

    pub fn push_event(mut self, event: DequeueEvent) -> Self {
        self.script.push_back(event);
        self
    }

    pub fn push_format(self, mime: &str) -> Self {
        self.push_event(DequeueEvent::FormatChanged(FormatDescriptor {
            mime: mime.to_string(),
            ..FormatDescriptor::default()
        }))
    }

    /// Append one encoded access unit backed by `payload`.
    pub fn push_unit(mut self, payload: Vec<u8>, pts_us: i64, flags: u32) -> Self {
        let index = self.buffers.len();
        let meta = UnitMeta {
            offset: 0,
            size: payload.len(),
            pts_us,
            flags,
        };
        self.buffers.push(payload);
        self.script.push_back(DequeueEvent::Unit(UnitHandle { index, meta }));
        self
    }
}

impl CodecSession for MockSession {
    fn configure(&mut self, format: &SessionFormat) -> SessionResult<()> {
        if self.configure_fails {
            return Err(SessionError::Device("format rejected".into()));
        }
        self.log.lock().unwrap().configured.push(format.clone());
        Ok(())
    }

    fn start(&mut self) -> SessionResult<()> {
        self.log.lock().unwrap().start_calls += 1;
        Ok(())
    }

    fn create_input_surface(&mut self) -> SessionResult<Box<dyn InputSurface>> {
        Ok(Box::new(MockSurface {
            log: self.log.clone(),
        }))
    }

    fn queue_input(&mut self, data: &[u8], pts_us: i64) -> SessionResult<bool> {
        self.log.lock().unwrap().queued.push((data.len(), pts_us));
        Ok(true)
    }

    fn signal_end_of_stream(&mut self) -> SessionResult<()> {
        if self.eos_signal_fails {
            return Err(SessionError::Device("end of stream rejected".into()));
        }
        self.log.lock().unwrap().eos_signals += 1;
        Ok(())
    }

    fn dequeue_output(&mut self, timeout: Duration) -> SessionResult<DequeueEvent> {
        if self.dequeue_fails {
            std::thread::sleep(timeout);
            return Err(SessionError::Device("output queue fault".into()));
        }
        if let Some(event) = self.script.pop_front() {
            return Ok(event);
        }
        if self.log.lock().unwrap().eos_signals > 0 && !self.eos_delivered {
            self.eos_delivered = true;
            let index = self.buffers.len();
            self.buffers.push(Vec::new());
            return Ok(DequeueEvent::Unit(UnitHandle {
                index,
                meta: UnitMeta {
                    offset: 0,
                    size: 0,
                    pts_us: 0,
                    flags: unit_flag::END_OF_STREAM,
                },
            }));
        }
        // A real dequeue blocks up to the timeout when nothing is ready.
        std::thread::sleep(timeout);
        Ok(DequeueEvent::TryAgain)
    }

    fn unit_data(&self, handle: &UnitHandle) -> &[u8] {
        &self.buffers[handle.index]
    }

    fn release_unit(&mut self, handle: UnitHandle) {
        self.log.lock().unwrap().released_units.push(handle.index);
    }

    fn flush(&mut self) -> SessionResult<()> {
        self.log.lock().unwrap().flush_calls += 1;
        Ok(())
    }

    fn stop(&mut self) -> SessionResult<()> {
        self.log.lock().unwrap().stop_calls += 1;
        Ok(())
    }

    fn release(&mut self) -> SessionResult<()> {
        self.log.lock().unwrap().release_calls += 1;
        Ok(())
    }
}

struct MockSurface {
    log: Arc<Mutex<SessionLog>>,
}

impl InputSurface for MockSurface {
    fn set_presentation_time(&mut self, pts_ns: i64) {
        self.log.lock().unwrap().presentation_times_ns.push(pts_ns);
    }

    fn swap_buffers(&mut self) -> SessionResult<()> {
        self.log.lock().unwrap().swap_count += 1;
        Ok(())
    }
}

/// Records every callback delivery for later assertions.
#[derive(Default)]
pub struct RecordingCallback {
    pub formats: Mutex<Vec<FormatDescriptor>>,
    pub units: Mutex<Vec<(Vec<u8>, UnitMeta)>>,
}

impl RecordingCallback {
    pub fn format_count(&self) -> usize {
        self.formats.lock().unwrap().len()
    }

    pub fn unit_count(&self) -> usize {
        self.units.lock().unwrap().len()
    }
}

impl EncoderCallback for RecordingCallback {
    fn on_format_changed(&self, format: &FormatDescriptor) {
        self.formats.lock().unwrap().push(format.clone());
    }

    fn on_data_encoded(&self, data: &[u8], meta: &UnitMeta) {
        self.units.lock().unwrap().push((data.to_vec(), *meta));
    }
}

/// Tracks the renderer contract: attach, size, draws, detach, in order.
#[derive(Default)]
pub struct RendererLog {
    pub attach_calls: usize,
    pub size_events: Vec<(u32, u32)>,
    pub draw_calls: usize,
    pub detach_calls: usize,
}

pub struct MockRenderer {
    pub log: Arc<Mutex<RendererLog>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(RendererLog::default())),
        }
    }
}

impl SurfaceRenderer for MockRenderer {
    fn attach(&mut self) {
        self.log.lock().unwrap().attach_calls += 1;
    }

    fn on_size_changed(&mut self, width: u32, height: u32) {
        self.log.lock().unwrap().size_events.push((width, height));
    }

    fn draw(&mut self) {
        self.log.lock().unwrap().draw_calls += 1;
    }

    fn detach(&mut self) {
        self.log.lock().unwrap().detach_calls += 1;
    }
}

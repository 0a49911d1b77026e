// This is free and unencumbered software released into the public domain.

use edgedetection::shared::{
    CameraConfig, CameraController, CameraDevice, CameraError, CameraEvent, CameraPlatform,
    CameraState, CaptureSession, DeviceCallbacks, Frame, FrameSink, FrameTarget, PermissionFlag,
    PermissionSource, PreviewSurface, SessionCallbacks, SessionOutputs,
};
use std::{
    any::Any,
    borrow::Cow,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
        mpsc::channel,
    },
    time::Duration,
};

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OpenOutcome {
    #[default]
    Opened,
    Disconnected,
    Error(i32),
    Rejected,
    /// Keeps the callbacks without completing the open.
    Pending,
}

/// Records every platform call and decides how each one completes.
#[derive(Default)]
struct Script {
    permission: PermissionFlag,
    open: Mutex<OpenOutcome>,
    configure_fails: AtomicBool,
    repeating_fails: AtomicBool,
    log: Mutex<Vec<&'static str>>,
    opened_ids: Mutex<Vec<String>>,
    pending: Mutex<Option<DeviceCallbacks>>,
}

impl Script {
    fn new() -> Arc<Self> {
        let script = Self::default();
        script.permission.set(true);
        Arc::new(script)
    }

    fn record(&self, call: &'static str) {
        self.log.lock().unwrap().push(call);
    }

    fn count(&self, call: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|c| **c == call).count()
    }

    fn calls(&self) -> Vec<&'static str> {
        self.log.lock().unwrap().clone()
    }
}

struct MockPlatform(Arc<Script>);

impl dogma::Named for MockPlatform {
    fn name(&self) -> Cow<'_, str> {
        "mock".into()
    }
}

impl CameraPlatform for MockPlatform {
    fn has_camera_permission(&self) -> bool {
        self.0.permission.camera_granted()
    }

    fn camera_ids(&self) -> Result<Vec<String>, CameraError> {
        Ok(vec!["0".into(), "1".into()])
    }

    fn open_device(&self, id: &str, callbacks: DeviceCallbacks) -> Result<(), CameraError> {
        self.0.record("open");
        self.0.opened_ids.lock().unwrap().push(id.to_string());
        assert_eq!(callbacks.device_id(), id);
        match *self.0.open.lock().unwrap() {
            OpenOutcome::Opened => callbacks.opened(MockDevice::new(&self.0, id)),
            OpenOutcome::Disconnected => callbacks.disconnected(),
            OpenOutcome::Error(code) => callbacks.error(code),
            OpenOutcome::Rejected => return Err(CameraError::NoCamera),
            OpenOutcome::Pending => *self.0.pending.lock().unwrap() = Some(callbacks),
        }
        Ok(())
    }
}

struct MockDevice {
    id: String,
    script: Arc<Script>,
    closed: bool,
}

impl MockDevice {
    fn new(script: &Arc<Script>, id: &str) -> Box<Self> {
        Box::new(Self {
            id: id.to_string(),
            script: Arc::clone(script),
            closed: false,
        })
    }
}

impl CameraDevice for MockDevice {
    fn id(&self) -> &str {
        &self.id
    }

    fn create_capture_session(
        &mut self,
        outputs: SessionOutputs<'_>,
        callbacks: SessionCallbacks,
    ) -> Result<(), CameraError> {
        self.script.record("configure");
        assert_eq!(outputs.size, (640, 480));
        if self.script.configure_fails.load(Ordering::SeqCst) {
            callbacks.configure_failed(CameraError::ConfigureFailed);
            return Ok(());
        }
        if let Some(frames) = outputs.frames {
            frames.send(Frame::new_i420(vec![0u8; Frame::i420_len(4, 2)], 4, 2));
        }
        callbacks.configured(Box::new(MockSession {
            script: Arc::clone(&self.script),
            closed: false,
        }));
        Ok(())
    }

    fn close(&mut self) -> Result<(), CameraError> {
        if !self.closed {
            self.closed = true;
            self.script.record("close_device");
        }
        Ok(())
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

struct MockSession {
    script: Arc<Script>,
    closed: bool,
}

impl CaptureSession for MockSession {
    fn set_repeating_request(&mut self) -> Result<(), CameraError> {
        if self.script.repeating_fails.load(Ordering::SeqCst) {
            return Err(CameraError::other("repeating request rejected"));
        }
        self.script.record("repeat");
        Ok(())
    }

    fn stop_repeating(&mut self) -> Result<(), CameraError> {
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.script.record("close_session");
        }
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[derive(Default)]
struct MockSurface {
    available: AtomicBool,
    buffer_size: Mutex<Option<(u32, u32)>>,
}

impl MockSurface {
    fn new(available: bool) -> Arc<Self> {
        let surface = Self::default();
        surface.available.store(available, Ordering::SeqCst);
        Arc::new(surface)
    }
}

impl PreviewSurface for MockSurface {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn set_default_buffer_size(&self, width: u32, height: u32) -> Result<(), CameraError> {
        *self.buffer_size.lock().unwrap() = Some((width, height));
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn no_frames() -> FrameSink {
    Arc::new(|_: Frame| {})
}

fn controller(script: &Arc<Script>, surface: &Arc<MockSurface>) -> CameraController {
    controller_with(script, surface, CameraConfig::default(), no_frames())
}

fn controller_with(
    script: &Arc<Script>,
    surface: &Arc<MockSurface>,
    config: CameraConfig,
    on_frame: FrameSink,
) -> CameraController {
    CameraController::new(
        Arc::new(MockPlatform(Arc::clone(script))),
        surface.clone(),
        config,
        on_frame,
    )
    .unwrap()
}

/// Drains notifications until one matches, returning everything seen.
fn wait_for(controller: &CameraController, done: impl Fn(&CameraEvent) -> bool) -> Vec<CameraEvent> {
    let mut seen = Vec::new();
    loop {
        match controller.events().recv_timeout(TIMEOUT) {
            Ok(event) => {
                let matched = done(&event);
                seen.push(event);
                if matched {
                    return seen;
                }
            },
            Err(_) => panic!("timed out waiting for camera event; saw {seen:?}"),
        }
    }
}

fn entered(state: CameraState) -> impl Fn(&CameraEvent) -> bool {
    move |event| matches!(event, CameraEvent::StateChanged { to, .. } if *to == state)
}

fn streaming(controller: &CameraController) {
    wait_for(controller, |e| matches!(e, CameraEvent::RepeatingStarted));
    assert_eq!(controller.state(), CameraState::Streaming);
}

#[test]
fn start_with_surface_streams_preview() {
    let script = Script::new();
    let surface = MockSurface::new(true);
    let mut camera = controller(&script, &surface);

    camera.start();
    streaming(&camera);

    assert_eq!(script.calls(), ["open", "configure", "repeat"]);
    assert_eq!(*surface.buffer_size.lock().unwrap(), Some((640, 480)));
}

#[test]
fn state_changes_follow_the_open_sequence() {
    let script = Script::new();
    let mut camera = controller(&script, &MockSurface::new(true));

    camera.start();
    let states: Vec<_> = wait_for(&camera, |e| matches!(e, CameraEvent::RepeatingStarted))
        .into_iter()
        .filter_map(|e| match e {
            CameraEvent::StateChanged { to, .. } => Some(to),
            _ => None,
        })
        .collect();

    assert_eq!(
        states,
        [CameraState::Opening, CameraState::Configuring, CameraState::Streaming]
    );
}

#[test]
fn start_without_surface_waits_for_it() {
    let script = Script::new();
    let surface = MockSurface::new(false);
    let mut camera = controller(&script, &surface);
    let listener = camera.surface_listener();

    camera.start();
    wait_for(&camera, entered(CameraState::AwaitingSurface));
    assert_eq!(script.count("open"), 0);

    surface.available.store(true, Ordering::SeqCst);
    listener.on_surface_available(1080, 1920);
    streaming(&camera);
    assert_eq!(script.count("open"), 1);
}

#[test]
fn size_and_update_notifications_change_nothing() {
    let script = Script::new();
    let mut camera = controller(&script, &MockSurface::new(true));
    let listener = camera.surface_listener();

    camera.start();
    streaming(&camera);
    listener.on_surface_size_changed(320, 240);
    listener.on_surface_updated();
    camera.stop();

    assert_eq!(script.count("open"), 1);
    assert_eq!(script.count("configure"), 1);
}

#[test]
fn permission_denied_at_start_never_opens() {
    let script = Script::new();
    script.permission.set(false);
    let mut camera = controller(&script, &MockSurface::new(true));

    camera.start();
    let denied: Vec<_> = camera.events().try_iter().collect();
    camera.stop();

    assert!(matches!(
        denied.as_slice(),
        [CameraEvent::Error { error: CameraError::PermissionDenied }]
    ));
    assert_eq!(camera.state(), CameraState::Closed);
    assert!(script.calls().is_empty());
}

#[test]
fn permission_revoked_before_surface_arrives() {
    let script = Script::new();
    let surface = MockSurface::new(false);
    let mut camera = controller(&script, &surface);

    camera.start();
    wait_for(&camera, entered(CameraState::AwaitingSurface));

    script.permission.set(false);
    surface.available.store(true, Ordering::SeqCst);
    camera.surface_listener().on_surface_available(640, 480);
    let seen = wait_for(&camera, entered(CameraState::Closed));

    assert!(seen.iter().any(|e| matches!(
        e,
        CameraEvent::Error { error: CameraError::PermissionDenied }
    )));
    assert_eq!(script.count("open"), 0);
}

#[test]
fn disconnect_while_opening_closes() {
    let script = Script::new();
    *script.open.lock().unwrap() = OpenOutcome::Disconnected;
    let mut camera = controller(&script, &MockSurface::new(true));

    camera.start();
    let seen = wait_for(&camera, entered(CameraState::Closed));

    assert!(seen.iter().any(|e| matches!(
        e,
        CameraEvent::Error { error: CameraError::Disconnected { device } } if device == "0"
    )));
    assert_eq!(script.count("configure"), 0);
}

#[test]
fn device_error_while_opening_closes() {
    let script = Script::new();
    *script.open.lock().unwrap() = OpenOutcome::Error(4);
    let mut camera = controller(&script, &MockSurface::new(true));

    camera.start();
    let seen = wait_for(&camera, entered(CameraState::Closed));

    assert!(seen.iter().any(|e| matches!(
        e,
        CameraEvent::Error { error: CameraError::Device { code: 4, .. } }
    )));
    assert_eq!(script.count("configure"), 0);
}

#[test]
fn rejected_open_closes() {
    let script = Script::new();
    *script.open.lock().unwrap() = OpenOutcome::Rejected;
    let mut camera = controller(&script, &MockSurface::new(true));

    camera.start();
    wait_for(&camera, entered(CameraState::Closed));
    assert_eq!(camera.state(), CameraState::Closed);
}

#[test]
fn configured_device_is_used() {
    let script = Script::new();
    let mut camera = controller_with(
        &script,
        &MockSurface::new(true),
        CameraConfig::new().with_device("1"),
        no_frames(),
    );

    camera.start();
    let seen = wait_for(&camera, |e| matches!(e, CameraEvent::RepeatingStarted));
    assert!(!seen.iter().any(|e| matches!(e, CameraEvent::Error { .. })));
    assert_eq!(*script.opened_ids.lock().unwrap(), ["1"]);
}

#[test]
fn first_listed_device_is_the_default() {
    let script = Script::new();
    let mut camera = controller(&script, &MockSurface::new(true));

    camera.start();
    streaming(&camera);
    assert_eq!(*script.opened_ids.lock().unwrap(), ["0"]);
}

#[test]
fn configure_failure_leaves_device_open_until_stop() {
    let script = Script::new();
    script.configure_fails.store(true, Ordering::SeqCst);
    let mut camera = controller(&script, &MockSurface::new(true));

    camera.start();
    let seen = wait_for(&camera, entered(CameraState::OpenIdle));
    assert!(seen.iter().any(|e| matches!(
        e,
        CameraEvent::Error { error: CameraError::ConfigureFailed }
    )));
    assert_eq!(script.count("repeat"), 0);
    assert_eq!(script.count("close_device"), 0);

    camera.stop();
    assert_eq!(script.count("close_device"), 1);
    assert_eq!(camera.state(), CameraState::Closed);
}

#[test]
fn repeating_failure_closes_the_session() {
    let script = Script::new();
    script.repeating_fails.store(true, Ordering::SeqCst);
    let mut camera = controller(&script, &MockSurface::new(true));

    camera.start();
    wait_for(&camera, entered(CameraState::OpenIdle));

    assert_eq!(script.count("close_session"), 1);
    assert_eq!(script.count("close_device"), 0);
}

#[test]
fn stop_closes_session_before_device() {
    let script = Script::new();
    let mut camera = controller(&script, &MockSurface::new(true));

    camera.start();
    streaming(&camera);
    camera.stop();

    assert_eq!(
        script.calls(),
        ["open", "configure", "repeat", "close_session", "close_device"]
    );
    assert_eq!(camera.state(), CameraState::Closed);
    assert!(!camera.is_running());
}

#[test]
fn stop_is_idempotent() {
    let script = Script::new();
    let mut camera = controller(&script, &MockSurface::new(true));

    camera.stop();
    camera.start();
    streaming(&camera);
    camera.stop();
    camera.stop();

    assert_eq!(script.count("close_session"), 1);
    assert_eq!(script.count("close_device"), 1);
}

#[test]
fn open_completing_after_stop_is_discarded() {
    let script = Script::new();
    *script.open.lock().unwrap() = OpenOutcome::Pending;
    let mut camera = controller(&script, &MockSurface::new(true));

    camera.start();
    wait_for(&camera, entered(CameraState::Opening));
    camera.stop();

    let callbacks = script.pending.lock().unwrap().take().expect("open in flight");
    callbacks.opened(MockDevice::new(&script, "0"));
    assert_eq!(script.count("close_device"), 1);

    camera.start();
    wait_for(&camera, entered(CameraState::Opening));
    callbacks.disconnected();
    callbacks.error(3);

    assert_eq!(camera.state(), CameraState::Opening);
    assert_eq!(script.count("configure"), 0);
    assert_eq!(script.count("close_device"), 1);

    camera.stop();
    assert_eq!(script.count("configure"), 0);
    assert_eq!(camera.state(), CameraState::Closed);
}

#[test]
fn immediate_stop_leaves_nothing_open() {
    for _ in 0..20 {
        let script = Script::new();
        let mut camera = controller(&script, &MockSurface::new(true));

        camera.start();
        camera.stop();

        assert_eq!(camera.state(), CameraState::Closed);
        assert_eq!(script.count("open"), script.count("close_device"));
        assert_eq!(script.count("configure"), script.count("close_session"));
    }
}

#[test]
fn restart_after_stop_streams_again() {
    let script = Script::new();
    let mut camera = controller(&script, &MockSurface::new(true));

    camera.start();
    streaming(&camera);
    camera.stop();
    camera.start();
    streaming(&camera);

    assert_eq!(script.count("open"), 2);
    assert_eq!(script.count("close_device"), 1);
}

#[test]
fn start_while_streaming_is_ignored() {
    let script = Script::new();
    let mut camera = controller(&script, &MockSurface::new(true));

    camera.start();
    streaming(&camera);
    camera.start();
    camera.stop();

    assert_eq!(script.count("open"), 1);
}

#[test]
fn surface_destroyed_while_streaming_warns() {
    let script = Script::new();
    let mut camera = controller(&script, &MockSurface::new(true));
    let listener = camera.surface_listener();

    camera.start();
    streaming(&camera);
    assert!(listener.on_surface_destroyed());
    wait_for(&camera, |e| matches!(e, CameraEvent::Warning { .. }));

    assert_eq!(camera.state(), CameraState::Streaming);
}

#[test]
fn listener_is_inert_when_stopped() {
    let script = Script::new();
    let camera = controller(&script, &MockSurface::new(true));
    let listener = camera.surface_listener();

    listener.on_surface_available(640, 480);
    assert!(listener.on_surface_destroyed());

    assert_eq!(camera.state(), CameraState::Closed);
    assert!(script.calls().is_empty());
}

#[test]
fn dropping_the_controller_closes_the_camera() {
    let script = Script::new();
    {
        let mut camera = controller(&script, &MockSurface::new(true));
        camera.start();
        streaming(&camera);
    }
    assert_eq!(script.count("close_session"), 1);
    assert_eq!(script.count("close_device"), 1);
}

#[test]
fn frames_reach_sinks_on_the_dispatcher_thread() {
    let script = Script::new();
    let (tx, rx) = channel();
    let tx = Mutex::new(tx);
    let sink: FrameSink = Arc::new(move |frame: Frame| {
        let thread = std::thread::current().name().map(str::to_string);
        let _ = tx.lock().unwrap().send((thread, frame.width, frame.height));
    });

    let mut camera = controller_with(
        &script,
        &MockSurface::new(true),
        CameraConfig::new().with_frame_target(FrameTarget::PreviewAndReader),
        sink,
    );
    camera.start();

    let (thread, width, height) = rx.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(thread.as_deref(), Some("CameraBackground-frames"));
    assert_eq!((width, height), (4, 2));
}

#[test]
fn preview_only_never_invokes_sinks() {
    let script = Script::new();
    let (tx, rx) = channel::<()>();
    let tx = Mutex::new(tx);
    let sink: FrameSink = Arc::new(move |_: Frame| {
        let _ = tx.lock().unwrap().send(());
    });

    let mut camera = controller_with(&script, &MockSurface::new(true), CameraConfig::default(), sink);
    camera.start();
    streaming(&camera);
    camera.stop();

    assert!(rx.try_recv().is_err());
}

#[test]
fn invalid_config_is_rejected() {
    let script = Script::new();
    let result = CameraController::new(
        Arc::new(MockPlatform(script)),
        MockSurface::new(true),
        CameraConfig::new().with_thread_name(""),
        no_frames(),
    );
    assert!(matches!(result, Err(CameraError::InvalidConfig(_))));
}

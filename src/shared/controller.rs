// This is free and unencumbered software released into the public domain.

//! Camera lifecycle controller.
//!
//! The controller binds one camera device to one preview surface. `start`
//! and `stop` are called from the host's UI thread; every device and session
//! completion is handled on a single background thread, in the order it was
//! posted, through the transition table in [`crate::shared::state`].
//!
//! `stop` bumps the controller generation before tearing anything down, so
//! events still queued from the previous run are discarded rather than
//! applied, then joins the background thread. Once `stop` returns, nothing
//! can mutate the controller until the next `start`.

use crate::shared::{
    Action, BackgroundThread, CameraConfig, CameraDevice, CameraError, CameraEvent,
    CameraPlatform, CameraState, CaptureSession, DeviceCallbacks, Dispatcher, EventKind,
    EventSender, FrameSender, FrameSink, FrameSinks, LifecycleEvent, PreviewSurface,
    SessionCallbacks, SessionOutputs, Transition, event_channel, notify,
};
use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex, MutexGuard, RwLock,
        mpsc::{Receiver, SyncSender},
    },
};
use tracing::{debug, error, info, warn};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

#[derive(Default)]
struct Shared {
    state: CameraState,
    generation: u64,
    device: Option<Box<dyn CameraDevice>>,
    session: Option<Box<dyn CaptureSession>>,
}

impl Shared {
    fn apply(&mut self, transition: Transition, events_tx: &SyncSender<CameraEvent>) {
        self.state = transition.to;
        if transition.from != transition.to {
            debug!(from = %transition.from, to = %transition.to, "camera state transition");
            notify(
                events_tx,
                CameraEvent::StateChanged {
                    from: transition.from,
                    to: transition.to,
                },
            );
        }
    }

    fn close_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(err) = session.stop_repeating() {
                debug!(%err, "stop repeating request failed");
            }
            session.close();
            debug!("capture session closed");
        }
    }

    fn close_device(&mut self) {
        if let Some(mut device) = self.device.take() {
            match device.close() {
                Ok(()) => info!(device = device.id(), "camera closed"),
                Err(err) => warn!(device = device.id(), %err, "failed to close camera"),
            }
        }
    }
}

/// Forwards preview surface notifications from the host to the controller.
///
/// Notifications only reach the controller while it is started; in any
/// other state they are dropped.
#[derive(Clone, Debug)]
pub struct SurfaceListener {
    slot: Arc<Mutex<Option<EventSender>>>,
}

impl SurfaceListener {
    pub fn on_surface_available(&self, width: u32, height: u32) {
        self.post(LifecycleEvent::SurfaceAvailable { width, height });
    }

    pub fn on_surface_size_changed(&self, width: u32, height: u32) {
        self.post(LifecycleEvent::SurfaceSizeChanged { width, height });
    }

    /// Returns `true`: the host may release the surface right away.
    pub fn on_surface_destroyed(&self) -> bool {
        self.post(LifecycleEvent::SurfaceDestroyed);
        true
    }

    /// Called once per rendered preview frame; nothing to do.
    pub fn on_surface_updated(&self) {}

    fn post(&self, event: LifecycleEvent) {
        if let Some(sender) = lock(&self.slot).as_ref() {
            sender.post(event);
        }
    }
}

/// Runs on the background thread.
struct Worker {
    shared: Arc<Mutex<Shared>>,
    platform: Arc<dyn CameraPlatform>,
    surface: Arc<dyn PreviewSurface>,
    config: CameraConfig,
    frames: Option<FrameSender>,
    events_tx: SyncSender<CameraEvent>,
}

impl Worker {
    fn handle(&self, sender: &EventSender, generation: u64, event: LifecycleEvent) {
        let mut shared = lock(&self.shared);
        if generation != shared.generation {
            debug!(?event, "discarding event posted before stop");
            return;
        }

        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            if self.config.diagnostics {
                info!(state = %shared.state, ?event, "camera event");
            }
            let Some(transition) = shared.state.on(event.kind()) else {
                self.ignore(shared.state, event);
                continue;
            };

            self.accept(&mut shared, event);
            shared.apply(transition, &self.events_tx);

            for action in transition.actions {
                if let Some(next) = self.execute(&mut shared, sender, *action) {
                    queue.push_back(next);
                }
            }
        }
    }

    /// Takes ownership of whatever the event carries and reports failures.
    fn accept(&self, shared: &mut Shared, event: LifecycleEvent) {
        match event {
            LifecycleEvent::DeviceOpened(device) => {
                info!(device = device.id(), "camera opened");
                shared.device = Some(device);
            },
            LifecycleEvent::SessionConfigured(session) => {
                shared.session = Some(session);
            },
            LifecycleEvent::PermissionDenied => {
                error!("camera permission not granted");
                self.report(CameraError::PermissionDenied);
            },
            LifecycleEvent::DeviceDisconnected { device } => {
                info!(%device, "camera disconnected");
                self.report(CameraError::Disconnected { device });
            },
            LifecycleEvent::DeviceError(err) => {
                error!(%err, "camera error");
                self.report(err);
            },
            LifecycleEvent::SessionConfigureFailed(err) => {
                error!(%err, "camera configuration failed");
                self.report(err);
            },
            LifecycleEvent::RepeatingFailed(err) => {
                error!(%err, "failed to start repeating preview request");
                self.report(err);
            },
            _ => {},
        }
    }

    fn ignore(&self, state: CameraState, event: LifecycleEvent) {
        match event {
            LifecycleEvent::SurfaceDestroyed if state.has_device() => {
                warn!(%state, "preview surface destroyed while camera is open");
                notify(
                    &self.events_tx,
                    CameraEvent::Warning {
                        message: "preview surface destroyed while camera is open".into(),
                    },
                );
            },
            LifecycleEvent::DeviceOpened(mut device) => {
                warn!(%state, device = device.id(), "unexpected camera open, closing it");
                let _ = device.close();
            },
            LifecycleEvent::SessionConfigured(mut session) => {
                debug!(%state, "capture session configured without a device, closing it");
                session.close();
            },
            event => debug!(%state, ?event, "event ignored"),
        }
    }

    fn report(&self, error: CameraError) {
        notify(&self.events_tx, CameraEvent::Error { error });
    }

    fn execute(
        &self,
        shared: &mut Shared,
        sender: &EventSender,
        action: Action,
    ) -> Option<LifecycleEvent> {
        match action {
            Action::AwaitSurface => {
                debug!("preview surface not ready, waiting for it before opening camera");
                None
            },
            Action::OpenDevice => self.open_device(sender),
            Action::ConfigureSession => self.configure_session(shared, sender),
            Action::StartRepeating => self.start_repeating(shared),
            Action::CloseSession => {
                shared.close_session();
                None
            },
            Action::CloseDevice => {
                shared.close_device();
                None
            },
        }
    }

    fn open_device(&self, sender: &EventSender) -> Option<LifecycleEvent> {
        if !self.platform.has_camera_permission() {
            return Some(LifecycleEvent::PermissionDenied);
        }
        if !self.surface.is_available() {
            return Some(LifecycleEvent::DeviceError(CameraError::SurfaceUnavailable));
        }

        let id = match self.select_device() {
            Ok(id) => id,
            Err(err) => return Some(LifecycleEvent::DeviceError(err)),
        };

        info!(device = %id, platform = %self.platform.name(), "opening camera");
        let callbacks = DeviceCallbacks::new(id.clone(), sender.clone());
        match self.platform.open_device(&id, callbacks) {
            Ok(()) => None,
            Err(err) => Some(LifecycleEvent::DeviceError(err)),
        }
    }

    fn select_device(&self) -> Result<String, CameraError> {
        if let Some(device) = &self.config.device {
            return Ok(device.clone());
        }
        self.platform
            .camera_ids()?
            .into_iter()
            .next()
            .ok_or(CameraError::NoCamera)
    }

    fn configure_session(&self, shared: &mut Shared, sender: &EventSender) -> Option<LifecycleEvent> {
        let Some(device) = shared.device.as_mut() else {
            return Some(LifecycleEvent::SessionConfigureFailed(CameraError::Closed));
        };

        let (width, height) = self.config.preview_size();
        if let Err(err) = self.surface.set_default_buffer_size(width, height) {
            return Some(LifecycleEvent::SessionConfigureFailed(err));
        }

        let outputs = SessionOutputs {
            preview: self.surface.as_ref(),
            size: (width, height),
            control_mode: self.config.control_mode,
            frames: self.frames.clone(),
        };
        match device.create_capture_session(outputs, SessionCallbacks::new(sender.clone())) {
            Ok(()) => None,
            Err(err) => Some(LifecycleEvent::SessionConfigureFailed(err)),
        }
    }

    fn start_repeating(&self, shared: &mut Shared) -> Option<LifecycleEvent> {
        let Some(session) = shared.session.as_mut() else {
            return Some(LifecycleEvent::RepeatingFailed(CameraError::Closed));
        };
        match session.set_repeating_request() {
            Ok(()) => {
                info!("camera preview started");
                notify(&self.events_tx, CameraEvent::RepeatingStarted);
                None
            },
            Err(err) => Some(LifecycleEvent::RepeatingFailed(err)),
        }
    }
}

pub struct CameraController {
    platform: Arc<dyn CameraPlatform>,
    surface: Arc<dyn PreviewSurface>,
    config: CameraConfig,
    shared: Arc<Mutex<Shared>>,
    listener: Arc<Mutex<Option<EventSender>>>,
    sinks: FrameSinks,
    background: Option<BackgroundThread>,
    dispatcher: Option<Dispatcher>,
    events_tx: SyncSender<CameraEvent>,
    events_rx: Receiver<CameraEvent>,
}

impl CameraController {
    pub fn new(
        platform: Arc<dyn CameraPlatform>,
        surface: Arc<dyn PreviewSurface>,
        config: CameraConfig,
        on_frame: FrameSink,
    ) -> Result<Self, CameraError> {
        config.validate()?;
        let (events_tx, events_rx) = event_channel();
        Ok(Self {
            platform,
            surface,
            config,
            shared: Arc::default(),
            listener: Arc::default(),
            sinks: Arc::new(RwLock::new(vec![on_frame])),
            background: None,
            dispatcher: None,
            events_tx,
            events_rx,
        })
    }

    pub fn state(&self) -> CameraState {
        lock(&self.shared).state
    }

    pub fn is_running(&self) -> bool {
        self.background.is_some()
    }

    pub fn events(&self) -> &Receiver<CameraEvent> {
        &self.events_rx
    }

    pub fn surface_listener(&self) -> SurfaceListener {
        SurfaceListener {
            slot: Arc::clone(&self.listener),
        }
    }

    /// Opens the camera now if the preview surface is available, otherwise
    /// once the surface listener reports it. Failures are logged and
    /// published as [`CameraEvent::Error`]; they are never returned.
    pub fn start(&mut self) {
        if let Err(err) = self.ensure_background() {
            error!(%err, "failed to start camera background thread");
            notify(&self.events_tx, CameraEvent::Error { error: err });
            return;
        }

        if !self.platform.has_camera_permission() {
            error!("camera permission not granted");
            notify(
                &self.events_tx,
                CameraEvent::Error {
                    error: CameraError::PermissionDenied,
                },
            );
            return;
        }

        let surface_available = self.surface.is_available();
        if let Some(sender) = lock(&self.listener).as_ref() {
            sender.post(LifecycleEvent::Start { surface_available });
        }
    }

    /// Closes the capture session and the device, then joins the background
    /// thread. Safe to call in any state, any number of times.
    pub fn stop(&mut self) {
        {
            let mut shared = lock(&self.shared);
            shared.generation += 1;
            if let Some(transition) = shared.state.on(EventKind::Stop) {
                shared.apply(transition, &self.events_tx);
                for action in transition.actions {
                    match action {
                        Action::CloseSession => shared.close_session(),
                        Action::CloseDevice => shared.close_device(),
                        _ => {},
                    }
                }
            }
        }

        lock(&self.listener).take();

        if let Some(background) = self.background.take() {
            let thread = background.name().to_string();
            match background.quit_and_join() {
                Ok(()) => debug!(%thread, "background thread stopped"),
                Err(err) => {
                    error!(%err, "error stopping background thread");
                    notify(&self.events_tx, CameraEvent::Error { error: err });
                },
            }
        }

        if let Some(mut dispatcher) = self.dispatcher.take() {
            dispatcher.stop();
        }
    }

    fn ensure_background(&mut self) -> Result<(), CameraError> {
        if self.background.is_some() {
            return Ok(());
        }

        let dispatcher = if self.config.frame_target.delivers_frames() {
            Some(Dispatcher::new(
                self.config.frame_buffer,
                &self.config.thread_name,
                Arc::clone(&self.sinks),
                self.events_tx.clone(),
            )?)
        } else {
            None
        };

        let worker = Worker {
            shared: Arc::clone(&self.shared),
            platform: Arc::clone(&self.platform),
            surface: Arc::clone(&self.surface),
            config: self.config.clone(),
            frames: dispatcher.as_ref().map(Dispatcher::sender),
            events_tx: self.events_tx.clone(),
        };

        let generation = lock(&self.shared).generation;
        let (background, sender) = BackgroundThread::spawn(
            &self.config.thread_name,
            generation,
            move |sender, generation, event| worker.handle(sender, generation, event),
        )?;
        debug!(thread = background.name(), "background thread started");

        *lock(&self.listener) = Some(sender);
        self.background = Some(background);
        self.dispatcher = dispatcher;
        Ok(())
    }
}

impl Drop for CameraController {
    fn drop(&mut self) {
        self.stop();
    }
}

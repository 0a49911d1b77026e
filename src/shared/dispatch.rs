// This is free and unencumbered software released into the public domain.

use crate::shared::{CameraError, CameraState, Frame};
use std::{
    sync::{
        Arc, RwLock,
        atomic::{AtomicBool, Ordering},
        mpsc::{Receiver, SyncSender, TrySendError, sync_channel},
    },
    thread::JoinHandle,
    time::Duration,
};

pub type FrameSink = Arc<dyn Fn(Frame) + Send + Sync + 'static>;

pub type FrameSinks = Arc<RwLock<Vec<FrameSink>>>;

/// Notifications published by a controller. Delivery never blocks; when the
/// receiver falls behind, notifications are dropped.
#[derive(Debug)]
pub enum CameraEvent {
    StateChanged { from: CameraState, to: CameraState },
    RepeatingStarted,
    FrameDropped,
    Warning { message: String },
    Error { error: CameraError },
}

pub(crate) const EVENT_CAPACITY: usize = 64;

pub fn event_channel() -> (SyncSender<CameraEvent>, Receiver<CameraEvent>) {
    sync_channel(EVENT_CAPACITY)
}

pub fn notify(events_tx: &SyncSender<CameraEvent>, event: CameraEvent) {
    let _ = events_tx.try_send(event);
}

pub enum FrameMsg {
    Frame(Frame),
    Stop,
}

/// Hands frames from the capture path to the frame dispatcher thread.
#[derive(Clone, Debug)]
pub struct FrameSender {
    frames_tx: SyncSender<FrameMsg>,
    events_tx: SyncSender<CameraEvent>,
}

impl FrameSender {
    pub fn send(&self, frame: Frame) {
        try_send_frame(&self.frames_tx, &self.events_tx, frame);
    }
}

/// Runs frame sinks on a dedicated thread so capture callbacks never wait
/// on them.
pub struct Dispatcher {
    tx: SyncSender<FrameMsg>,
    events_tx: SyncSender<CameraEvent>,
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl Dispatcher {
    pub fn new(
        capacity: usize,
        thread_name: &str,
        sinks: FrameSinks,
        events_tx: SyncSender<CameraEvent>,
    ) -> Result<Self, CameraError> {
        let (tx, rx) = sync_channel::<FrameMsg>(capacity.max(1));
        let stop = Arc::new(AtomicBool::new(false));
        let stop2 = Arc::clone(&stop);

        let join = std::thread::Builder::new()
            .name(format!("{thread_name}-frames"))
            .spawn(move || {
                while !stop2.load(Ordering::Relaxed) {
                    match rx.recv_timeout(Duration::from_millis(200)) {
                        Ok(FrameMsg::Frame(frame)) => {
                            if let Ok(list) = sinks.read() {
                                for s in list.iter() {
                                    (s)(frame.clone());
                                }
                            }
                        },
                        Ok(FrameMsg::Stop) => break,
                        Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
                        Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .map_err(CameraError::ThreadSpawn)?;

        Ok(Self {
            tx,
            events_tx,
            stop,
            join: Some(join),
        })
    }

    pub fn sender(&self) -> FrameSender {
        FrameSender {
            frames_tx: self.tx.clone(),
            events_tx: self.events_tx.clone(),
        }
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = self.tx.try_send(FrameMsg::Stop);
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

pub fn try_send_frame(
    frame_tx: &SyncSender<FrameMsg>,
    events_tx: &SyncSender<CameraEvent>,
    frame: Frame,
) {
    match frame_tx.try_send(FrameMsg::Frame(frame)) {
        Ok(()) => {},
        Err(TrySendError::Full(_)) => notify(events_tx, CameraEvent::FrameDropped),
        Err(TrySendError::Disconnected(_)) => notify(
            events_tx,
            CameraEvent::Error {
                error: CameraError::Closed,
            },
        ),
    }
}

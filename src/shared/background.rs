// This is free and unencumbered software released into the public domain.

use crate::shared::{CameraError, LifecycleEvent};
use std::{
    sync::mpsc::{Sender, channel},
    thread::JoinHandle,
};

enum Job {
    Event { generation: u64, event: LifecycleEvent },
    Quit,
}

/// Posts events onto a [`BackgroundThread`]. Each sender is stamped with the
/// controller generation it was created for.
#[derive(Clone, Debug)]
pub struct EventSender {
    tx: Sender<Job>,
    generation: u64,
}

impl EventSender {
    /// Returns `false` once the thread has quit; the event (and any handle
    /// it carries) is dropped.
    pub fn post(&self, event: LifecycleEvent) -> bool {
        let job = Job::Event {
            generation: self.generation,
            event,
        };
        match self.tx.send(job) {
            Ok(()) => true,
            Err(rejected) => {
                if let Job::Event { event, .. } = rejected.0 {
                    tracing::trace!(?event, "background thread gone, event dropped");
                }
                false
            },
        }
    }
}

impl core::fmt::Debug for Job {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Event { generation, event } => write!(f, "Event#{generation}({event:?})"),
            Self::Quit => f.write_str("Quit"),
        }
    }
}

/// A named thread draining a FIFO of lifecycle events.
pub struct BackgroundThread {
    name: String,
    tx: Sender<Job>,
    join: Option<JoinHandle<()>>,
}

impl BackgroundThread {
    pub fn spawn<H>(
        name: &str,
        generation: u64,
        mut handler: H,
    ) -> Result<(Self, EventSender), CameraError>
    where
        H: FnMut(&EventSender, u64, LifecycleEvent) + Send + 'static,
    {
        let (tx, rx) = channel::<Job>();
        let sender = EventSender {
            tx: tx.clone(),
            generation,
        };
        let own = sender.clone();

        let join = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    match job {
                        Job::Event { generation, event } => handler(&own, generation, event),
                        Job::Quit => break,
                    }
                }
            })
            .map_err(CameraError::ThreadSpawn)?;

        Ok((
            Self {
                name: name.to_string(),
                tx,
                join: Some(join),
            },
            sender,
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lets the thread finish every event queued so far, then joins it.
    /// There is no timeout: a handler stuck in a platform call blocks here.
    pub fn quit_and_join(mut self) -> Result<(), CameraError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), CameraError> {
        let Some(join) = self.join.take() else {
            return Ok(());
        };
        let _ = self.tx.send(Job::Quit);
        join.join().map_err(|_| CameraError::ThreadPanicked {
            thread: self.name.clone(),
        })
    }
}

impl Drop for BackgroundThread {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

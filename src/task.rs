//! Periodic background tasks
//!
//! A named thread that runs a closure once per interval until it is stopped
//! or the closure asks to break. Stopping is explicit (`stop`) or implicit on
//! drop, and always joins the thread.

use std::ops::ControlFlow;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Sender};

use crate::error::Result;

pub(crate) struct PeriodicTask {
    name: String,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    pub fn spawn<F>(name: String, interval: Duration, mut tick: F) -> Result<Self>
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = channel::bounded::<()>(1);

        let handle = thread::Builder::new().name(name.clone()).spawn({
            let name = name.clone();
            move || {
                let ticker = channel::tick(interval);
                loop {
                    let stopped = crossbeam::select! {
                        recv(ticker) -> _ => false,
                        recv(stop_rx) -> _ => true,
                    };
                    if stopped || tick().is_break() {
                        break;
                    }
                }
                tracing::debug!(task = %name, "background task stopped");
            }
        })?;

        Ok(Self {
            name,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Cancel the task and wait for it to exit
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            // A task that already broke out has dropped its receiver
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!(task = %self.name, "background task panicked");
            }
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.shutdown();
    }
}

//! Shared shape of a log sink: a background thread draining the engine's
//! command channel. IO latency never reaches the compute workers; a sink
//! failure is deferred and surfaces when the sink is closed.

use crate::error::{IoError, Result};
use contagium_core::logger::{LogCommand, Logger, LOG_CHANNEL_BOUND};
use contagium_core::SimError;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

/// Handle over a running sink thread.
pub struct LogSinkHandle {
    sender: SyncSender<LogCommand>,
    handle: JoinHandle<Result<()>>,
}

impl LogSinkHandle {
    /// Spawn a sink draining commands through `worker`.
    pub(crate) fn spawn<F>(worker: F) -> Self
    where
        F: FnOnce(Receiver<LogCommand>) -> Result<()> + Send + 'static,
    {
        let (sender, receiver) = sync_channel(LOG_CHANNEL_BOUND);
        let handle = thread::spawn(move || worker(receiver));
        Self { sender, handle }
    }

    /// Producer handle to clone into the engine.
    #[must_use]
    pub fn logger(&self) -> Logger {
        Logger::from_sender(self.sender.clone())
    }

    /// Stop the sink and surface any deferred IO error.
    pub fn close(self) -> Result<()> {
        // The sink may already have exited on its own error; a failed send
        // is fine either way, the join result is what matters.
        let _ = self.sender.send(LogCommand::Stop);
        drop(self.sender);
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => Err(IoError::Sim(SimError::runtime("log sink thread panicked"))),
        }
    }
}

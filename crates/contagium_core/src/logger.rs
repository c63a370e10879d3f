//! Streaming log interface.
//!
//! The engine never performs IO: every record goes through a bounded
//! command channel drained by a dedicated sink thread (CSV or SQLite in the
//! IO crate). Producers are the parallel phase workers; the channel sender
//! is cloned freely into them. A `Flush` command marks each generation
//! boundary so sinks can batch; `Stop` shuts the sink down.

use crate::error::{Result, SimError};
use contagium_data::{
    FrequencyRow, GenotypeRow, MutationRow, NodeRow, StatusRow, TransmissionRow,
};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

/// Commands consumed by a log sink thread.
#[derive(Debug, Clone, PartialEq)]
pub enum LogCommand {
    /// A newly interned genotype.
    Genotype(GenotypeRow),
    /// A newly allocated genealogy node.
    Node(NodeRow),
    /// Per-host genotype frequency at a logged generation.
    Frequency(FrequencyRow),
    /// A mutation that produced a new node.
    Mutation(MutationRow),
    /// Host status at a logged generation.
    Status(StatusRow),
    /// One migrant pathogen crossing an edge.
    Transmission(TransmissionRow),
    /// Generation boundary; sinks flush batched rows.
    Flush { generation: u64 },
    /// Shut the sink down.
    Stop,
}

/// Depth of the sink command channel. Producers block when a sink falls
/// this far behind.
pub const LOG_CHANNEL_BOUND: usize = 16_384;

/// Cloneable producer handle. A disabled logger drops every record, which
/// is what unit tests and dry runs use.
#[derive(Clone)]
pub struct Logger {
    tx: Option<SyncSender<LogCommand>>,
}

impl Logger {
    /// A logger that swallows everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Wrap the producer side of a sink channel.
    #[must_use]
    pub fn from_sender(tx: SyncSender<LogCommand>) -> Self {
        Self { tx: Some(tx) }
    }

    /// In-memory sink for tests: collects every row until `Stop`.
    #[must_use]
    pub fn capture() -> (Self, CapturedLog) {
        let (tx, rx) = sync_channel(LOG_CHANNEL_BOUND);
        let handle = thread::spawn(move || collect(rx));
        (Self { tx: Some(tx) }, CapturedLog { handle })
    }

    fn send(&self, command: LogCommand) -> Result<()> {
        match &self.tx {
            None => Ok(()),
            Some(tx) => tx
                .send(command)
                .map_err(|_| SimError::runtime("log sink closed while the run was producing")),
        }
    }

    pub fn genotype(&self, row: GenotypeRow) -> Result<()> {
        self.send(LogCommand::Genotype(row))
    }

    pub fn node(&self, row: NodeRow) -> Result<()> {
        self.send(LogCommand::Node(row))
    }

    pub fn frequency(&self, row: FrequencyRow) -> Result<()> {
        self.send(LogCommand::Frequency(row))
    }

    pub fn mutation(&self, row: MutationRow) -> Result<()> {
        self.send(LogCommand::Mutation(row))
    }

    pub fn status(&self, row: StatusRow) -> Result<()> {
        self.send(LogCommand::Status(row))
    }

    pub fn transmission(&self, row: TransmissionRow) -> Result<()> {
        self.send(LogCommand::Transmission(row))
    }

    /// Close the generation's producer streams; sinks flush.
    pub fn flush_generation(&self, generation: u64) -> Result<()> {
        self.send(LogCommand::Flush { generation })
    }

    /// Ask the sink to shut down. Further sends fail.
    pub fn stop(&self) -> Result<()> {
        self.send(LogCommand::Stop)
    }
}

/// Everything a capture sink saw, by stream.
#[derive(Debug, Default, Clone)]
pub struct CapturedRows {
    pub genotypes: Vec<GenotypeRow>,
    pub nodes: Vec<NodeRow>,
    pub frequencies: Vec<FrequencyRow>,
    pub mutations: Vec<MutationRow>,
    pub statuses: Vec<StatusRow>,
    pub transmissions: Vec<TransmissionRow>,
    pub flushes: Vec<u64>,
}

fn collect(rx: Receiver<LogCommand>) -> CapturedRows {
    let mut rows = CapturedRows::default();
    while let Ok(command) = rx.recv() {
        match command {
            LogCommand::Genotype(row) => rows.genotypes.push(row),
            LogCommand::Node(row) => rows.nodes.push(row),
            LogCommand::Frequency(row) => rows.frequencies.push(row),
            LogCommand::Mutation(row) => rows.mutations.push(row),
            LogCommand::Status(row) => rows.statuses.push(row),
            LogCommand::Transmission(row) => rows.transmissions.push(row),
            LogCommand::Flush { generation } => rows.flushes.push(generation),
            LogCommand::Stop => break,
        }
    }
    rows
}

/// Join handle over a capture sink.
pub struct CapturedLog {
    handle: JoinHandle<CapturedRows>,
}

impl CapturedLog {
    /// Wait for the sink to drain (send `Logger::stop` first) and return
    /// everything it saw.
    #[must_use]
    pub fn finish(self) -> CapturedRows {
        self.handle.join().expect("capture sink panicked")
    }
}

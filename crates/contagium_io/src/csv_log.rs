//! CSV log sink: one file per stream under the log directory.

use crate::error::Result;
use crate::sink::LogSinkHandle;
use contagium_core::logger::LogCommand;
use csv::Writer;
use std::fs::{self, File};
use std::path::Path;

struct CsvStreams {
    genotypes: Writer<File>,
    nodes: Writer<File>,
    frequencies: Writer<File>,
    mutations: Writer<File>,
    statuses: Writer<File>,
    transmissions: Writer<File>,
}

impl CsvStreams {
    fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let open = |name: &str| -> Result<Writer<File>> {
            Ok(Writer::from_writer(File::create(dir.join(name))?))
        };
        Ok(Self {
            genotypes: open("genotypes.csv")?,
            nodes: open("nodes.csv")?,
            frequencies: open("frequencies.csv")?,
            mutations: open("mutations.csv")?,
            statuses: open("statuses.csv")?,
            transmissions: open("transmissions.csv")?,
        })
    }

    fn flush(&mut self) -> Result<()> {
        self.genotypes.flush()?;
        self.nodes.flush()?;
        self.frequencies.flush()?;
        self.mutations.flush()?;
        self.statuses.flush()?;
        self.transmissions.flush()?;
        Ok(())
    }
}

/// Spawn a CSV sink writing the six streams under `dir`. Headers come from
/// the row structs; rows are flushed at generation boundaries.
pub fn spawn_csv_sink(dir: &Path) -> Result<LogSinkHandle> {
    let mut streams = CsvStreams::open(dir)?;
    tracing::debug!(dir = %dir.display(), "csv sink opened");
    Ok(LogSinkHandle::spawn(move |rx| {
        while let Ok(command) = rx.recv() {
            match command {
                LogCommand::Genotype(row) => streams.genotypes.serialize(row)?,
                LogCommand::Node(row) => streams.nodes.serialize(row)?,
                LogCommand::Frequency(row) => streams.frequencies.serialize(row)?,
                LogCommand::Mutation(row) => streams.mutations.serialize(row)?,
                LogCommand::Status(row) => streams.statuses.serialize(row)?,
                LogCommand::Transmission(row) => streams.transmissions.serialize(row)?,
                LogCommand::Flush { .. } => streams.flush()?,
                LogCommand::Stop => break,
            }
        }
        streams.flush()
    }))
}

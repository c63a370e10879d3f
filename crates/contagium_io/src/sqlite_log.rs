//! SQLite log sink: six tables in one database file.
//!
//! Rows are buffered in memory and written inside one transaction per
//! generation (the `Flush` command), so the database sees large batched
//! inserts instead of per-row round trips.

use crate::error::Result;
use crate::sink::LogSinkHandle;
use contagium_core::logger::LogCommand;
use contagium_data::{
    FrequencyRow, GenotypeRow, MutationRow, NodeRow, StatusRow, TransmissionRow,
};
use rusqlite::{params, Connection};
use std::fs;
use std::path::Path;

/// Database file name under the log directory.
pub const DB_FILE: &str = "contagium.db";

fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS genotypes (
            uid BLOB PRIMARY KEY,
            sequence TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS nodes (
            uid BLOB PRIMARY KEY,
            genotype_uid BLOB NOT NULL
        );
        CREATE TABLE IF NOT EXISTS frequencies (
            instance INTEGER NOT NULL,
            generation INTEGER NOT NULL,
            host INTEGER NOT NULL,
            genotype_uid BLOB NOT NULL,
            freq INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS mutations (
            instance INTEGER NOT NULL,
            generation INTEGER NOT NULL,
            host INTEGER NOT NULL,
            parent_uid BLOB NOT NULL,
            child_uid BLOB NOT NULL
        );
        CREATE TABLE IF NOT EXISTS statuses (
            instance INTEGER NOT NULL,
            generation INTEGER NOT NULL,
            host INTEGER NOT NULL,
            status INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS transmissions (
            instance INTEGER NOT NULL,
            generation INTEGER NOT NULL,
            src INTEGER NOT NULL,
            dst INTEGER NOT NULL,
            node_uid BLOB NOT NULL
        );",
    )?;
    Ok(())
}

#[derive(Default)]
struct Buffers {
    genotypes: Vec<GenotypeRow>,
    nodes: Vec<NodeRow>,
    frequencies: Vec<FrequencyRow>,
    mutations: Vec<MutationRow>,
    statuses: Vec<StatusRow>,
    transmissions: Vec<TransmissionRow>,
}

impl Buffers {
    fn is_empty(&self) -> bool {
        self.genotypes.is_empty()
            && self.nodes.is_empty()
            && self.frequencies.is_empty()
            && self.mutations.is_empty()
            && self.statuses.is_empty()
            && self.transmissions.is_empty()
    }

    fn write(&mut self, conn: &mut Connection) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        let tx = conn.transaction()?;
        for row in self.genotypes.drain(..) {
            tx.execute(
                "INSERT OR IGNORE INTO genotypes (uid, sequence) VALUES (?1, ?2)",
                params![row.uid, row.sequence],
            )?;
        }
        for row in self.nodes.drain(..) {
            tx.execute(
                "INSERT OR IGNORE INTO nodes (uid, genotype_uid) VALUES (?1, ?2)",
                params![row.uid, row.genotype_uid],
            )?;
        }
        for row in self.frequencies.drain(..) {
            tx.execute(
                "INSERT INTO frequencies (instance, generation, host, genotype_uid, freq)
                  VALUES (?1, ?2, ?3, ?4, ?5)",
                params![row.instance, row.generation, row.host, row.genotype_uid, row.freq],
            )?;
        }
        for row in self.mutations.drain(..) {
            tx.execute(
                "INSERT INTO mutations (instance, generation, host, parent_uid, child_uid)
                  VALUES (?1, ?2, ?3, ?4, ?5)",
                params![row.instance, row.generation, row.host, row.parent_uid, row.child_uid],
            )?;
        }
        for row in self.statuses.drain(..) {
            tx.execute(
                "INSERT INTO statuses (instance, generation, host, status)
                  VALUES (?1, ?2, ?3, ?4)",
                params![row.instance, row.generation, row.host, row.status],
            )?;
        }
        for row in self.transmissions.drain(..) {
            tx.execute(
                "INSERT INTO transmissions (instance, generation, src, dst, node_uid)
                  VALUES (?1, ?2, ?3, ?4, ?5)",
                params![row.instance, row.generation, row.src, row.dst, row.node_uid],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

/// Spawn a SQLite sink writing to `dir/contagium.db`.
pub fn spawn_sqlite_sink(dir: &Path) -> Result<LogSinkHandle> {
    fs::create_dir_all(dir)?;
    let mut conn = Connection::open(dir.join(DB_FILE))?;
    init_db(&conn)?;
    let _ = conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;");
    tracing::debug!(dir = %dir.display(), "sqlite sink opened");

    Ok(LogSinkHandle::spawn(move |rx| {
        let mut buffers = Buffers::default();
        while let Ok(command) = rx.recv() {
            match command {
                LogCommand::Genotype(row) => buffers.genotypes.push(row),
                LogCommand::Node(row) => buffers.nodes.push(row),
                LogCommand::Frequency(row) => buffers.frequencies.push(row),
                LogCommand::Mutation(row) => buffers.mutations.push(row),
                LogCommand::Status(row) => buffers.statuses.push(row),
                LogCommand::Transmission(row) => buffers.transmissions.push(row),
                LogCommand::Flush { .. } => buffers.write(&mut conn)?,
                LogCommand::Stop => break,
            }
        }
        buffers.write(&mut conn)
    }))
}

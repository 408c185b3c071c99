use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::ExecutionSink;
use crate::error::SignalError;
use crate::model::TradeInstruction;

#[derive(Debug, Serialize)]
struct JournalRecord<'a> {
    at: DateTime<Utc>,
    #[serde(flatten)]
    instruction: &'a TradeInstruction,
}

/// Append-only JSONL record of every instruction handed to the execution
/// layer. One JSON object per line; write failures are logged, never
/// propagated (the sink is fire-and-forget).
pub struct TradeJournal {
    path: PathBuf,
    file: File,
}

impl TradeJournal {
    pub fn open(path: &Path) -> Result<Self, SignalError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    fn append(&mut self, instruction: &TradeInstruction) {
        let record = JournalRecord {
            at: Utc::now(),
            instruction,
        };
        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize journal record");
                return;
            }
        };
        if let Err(e) = writeln!(self.file, "{line}") {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to append journal record");
        }
    }
}

/// ExecutionSink that logs every instruction and journals it to disk.
pub struct JournalingSink {
    journal: TradeJournal,
}

impl JournalingSink {
    pub fn new(journal: TradeJournal) -> Self {
        Self { journal }
    }
}

impl ExecutionSink for JournalingSink {
    fn set_target_weight(&mut self, symbol: &str, weight: f64) {
        tracing::info!(symbol = %symbol, weight, "Target weight emitted");
        self.journal.append(&TradeInstruction::SetTargetWeight {
            symbol: symbol.to_string(),
            weight,
        });
    }

    fn liquidate(&mut self, symbol: &str) {
        tracing::info!(symbol = %symbol, "Liquidation emitted");
        self.journal.append(&TradeInstruction::Liquidate {
            symbol: symbol.to_string(),
        });
    }
}

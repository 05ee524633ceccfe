use crate::payload::{parse_payload, PayloadEvent};
use chat_store::{MessageStore, NewMessage, StoreError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("cannot read payload directory {path:?}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Counters for one ingestion run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub files_seen: usize,
    pub files_skipped: usize,
    pub messages_inserted: usize,
    pub statuses_applied: usize,
    pub statuses_unmatched: usize,
}

impl IngestReport {
    fn absorb(&mut self, other: IngestReport) {
        self.messages_inserted += other.messages_inserted;
        self.statuses_applied += other.statuses_applied;
        self.statuses_unmatched += other.statuses_unmatched;
    }
}

/// Applies webhook payloads to the message store
pub struct Ingestor {
    store: MessageStore,
}

impl Ingestor {
    pub fn new(store: MessageStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Apply extracted events in order
    pub async fn apply(&self, events: Vec<PayloadEvent>) -> Result<IngestReport, StoreError> {
        let mut report = IngestReport::default();

        for event in events {
            match event {
                PayloadEvent::Message(msg) => {
                    let contact_id = msg.contact_id.clone();
                    self.store
                        .insert(NewMessage::incoming(
                            msg.contact_id,
                            msg.name,
                            msg.body,
                            msg.timestamp,
                            msg.correlation_id,
                        ))
                        .await?;
                    report.messages_inserted += 1;
                    info!("Inserted message from {}", contact_id);
                }
                PayloadEvent::Status {
                    correlation_id,
                    status,
                } => {
                    match self
                        .store
                        .update_status_by_correlation(&correlation_id, status)
                        .await?
                    {
                        Some(updated) => {
                            report.statuses_applied += 1;
                            info!(
                                "Updated status for {} -> {} (message {})",
                                correlation_id, status, updated.id
                            );
                        }
                        None => {
                            report.statuses_unmatched += 1;
                            debug!(
                                "No message matches {}, dropping status {}",
                                correlation_id, status
                            );
                        }
                    }
                }
            }
        }

        Ok(report)
    }

    /// Ingest one file. `Ok(None)` means the file was skipped as malformed.
    pub async fn ingest_file(&self, path: &Path) -> Result<Option<IngestReport>, StoreError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Skipped file {:?}: {}", path, e);
                return Ok(None);
            }
        };

        let events = match parse_payload(&bytes) {
            Ok(events) => events,
            Err(e) => {
                warn!("Skipped file {:?}: not a message/status format ({})", path, e);
                return Ok(None);
            }
        };

        self.apply(events).await.map(Some)
    }

    /// Ingest every file of `dir` in file-name order.
    ///
    /// Malformed files are skipped; a store failure ends the run.
    pub async fn ingest_dir(&self, dir: &Path) -> Result<IngestReport, IngestError> {
        let files = list_payload_files(dir).await?;
        info!("Found {} payload files in {:?}", files.len(), dir);

        let mut report = IngestReport::default();
        for path in files {
            report.files_seen += 1;
            match self.ingest_file(&path).await? {
                Some(file_report) => report.absorb(file_report),
                None => report.files_skipped += 1,
            }
        }

        info!(
            "Finished processing payloads: {} files ({} skipped), {} messages inserted, {} statuses applied, {} unmatched",
            report.files_seen,
            report.files_skipped,
            report.messages_inserted,
            report.statuses_applied,
            report.statuses_unmatched
        );

        Ok(report)
    }
}

async fn list_payload_files(dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let dir_error = |source| IngestError::Directory {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(dir_error)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(dir_error)? {
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        } else {
            debug!("Ignoring non-file entry {:?}", path);
        }
    }

    files.sort();
    Ok(files)
}

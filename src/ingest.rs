/*!
 * Streaming ingestion of TMX files into a store.
 *
 * A reader thread parses the document and sends immutable header and unit
 * values through a bounded channel; the calling thread stores them and
 * commits every `commit_chunk` units. A failure keeps the chunks already
 * committed and rolls back the one in progress.
 */

use log::{debug, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, sync_channel};
use std::thread;

use crate::errors::{Result, TmxError};
use crate::model::Header;
use crate::store::{Backend, Store};
use crate::xml::{TmxEvent, TmxReader};

/// Outcome of loading one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// `<tu>` elements found in the document
    pub units_read: usize,
    pub stored: usize,
    /// Units rejected for lack of a valid-language variant
    pub discarded: usize,
    /// `<tuv>` elements rejected for a missing or invalid language
    pub variants_dropped: usize,
    pub version: Option<String>,
}

/// Counters the reader thread hands back when it finishes
struct ReaderSummary {
    units_read: usize,
    variants_dropped: usize,
    version: Option<String>,
}

fn spawn_reader(
    path: PathBuf,
    capacity: usize,
) -> Result<(Receiver<Result<TmxEvent>>, thread::JoinHandle<ReaderSummary>)> {
    let mut reader = TmxReader::from_path(&path)?;
    let (sender, receiver) = sync_channel(capacity.max(1));
    let handle = thread::Builder::new()
        .name("tmx-reader".to_string())
        .spawn(move || {
            loop {
                let event = reader.next_event().transpose();
                let Some(event) = event else { break };
                let failed = event.is_err();
                // A closed channel means the consumer gave up
                if sender.send(event).is_err() || failed {
                    break;
                }
            }
            ReaderSummary {
                units_read: reader.units_read(),
                variants_dropped: reader.variants_dropped(),
                version: reader.version().map(str::to_string),
            }
        })?;
    Ok((receiver, handle))
}

/// Load a TMX file into the store, appending after any existing units
pub fn load_file<B: Backend, P: AsRef<Path>>(store: &mut Store<B>, path: P) -> Result<IngestReport> {
    let path = path.as_ref();
    info!("Loading {:?}", path);
    store.check_writable()?;
    store.progress().reset();

    let chunk = store.config().commit_chunk.max(1);
    let (receiver, handle) = spawn_reader(path.to_path_buf(), store.config().channel_capacity)?;

    let mut stored = 0;
    let mut pending = 0;
    let mut header_seen = false;
    let outcome = (|| -> Result<()> {
        store.backend_mut().begin()?;
        for event in receiver.iter() {
            match event? {
                TmxEvent::Header(header) => {
                    store.set_header(&header)?;
                    header_seen = true;
                }
                TmxEvent::Unit(unit) => {
                    if store.store_unit(unit, false)?.is_some() {
                        stored += 1;
                        pending += 1;
                    }
                    if pending >= chunk {
                        store.backend_mut().commit()?;
                        debug!("Committed {} units", stored);
                        store.backend_mut().begin()?;
                        pending = 0;
                    }
                }
            }
        }
        if !header_seen {
            warn!("{:?} has no header, using defaults", path);
            store.set_header(&Header::default())?;
        }
        store.backend_mut().commit()
    })();

    if let Err(e) = &outcome {
        // Units of the open chunk are rolled back and no longer count as stored
        stored -= pending;
        store.progress().sub_count(pending);
        warn!("Loading {:?} failed after {} units: {}", path, stored, e);
        if let Err(rollback) = store.backend_mut().rollback() {
            warn!("Rollback failed: {}", rollback);
        }
    }
    // Unblock the reader before joining it
    drop(receiver);
    let summary = handle
        .join()
        .map_err(|_| TmxError::Malformed("reader thread panicked".to_string()))?;
    outcome?;

    let report = IngestReport {
        units_read: summary.units_read,
        stored,
        discarded: store.discarded(),
        variants_dropped: summary.variants_dropped,
        version: summary.version,
    };
    info!(
        "Loaded {} units ({} discarded, {} variants dropped)",
        report.stored, report.discarded, report.variants_dropped
    );
    Ok(report)
}

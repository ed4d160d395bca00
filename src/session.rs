/*!
 * Editing session: at most one open store plus its background task.
 *
 * Corpus-wide operations run on tokio's blocking pool and report a
 * `{running, error, processed}` status that callers poll. Foreground calls
 * wait for the store lock at most `lock_timeout_ms` and fail with `Busy`
 * instead of blocking behind a long operation.
 */

use log::{debug, error, info};
use parking_lot::Mutex;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::app_config::StoreConfig;
use crate::errors::{Result, TmxError};
use crate::ingest;
use crate::store::{Progress, ProgressSnapshot, SqliteBackend, Store};

type SharedStore = Arc<Mutex<Option<Store<SqliteBackend>>>>;

/// Kind of background operation, selects which counter is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Load,
    Save,
    Export,
    Batch,
}

/// Polled state of the current or last background operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskStatus {
    pub running: bool,
    pub error: Option<String>,
    pub processed: usize,
}

#[derive(Debug, Default)]
struct TaskState {
    kind: Option<TaskKind>,
    running: bool,
    error: Option<String>,
}

/// Owner of the open corpus
pub struct Session {
    config: StoreConfig,
    store: SharedStore,
    /// Counters of the open store, readable while a task holds the lock
    progress: Mutex<Option<Arc<Progress>>>,
    state: Arc<Mutex<TaskState>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            store: Arc::new(Mutex::new(None)),
            progress: Mutex::new(None),
            state: Arc::new(Mutex::new(TaskState::default())),
            task: Mutex::new(None),
        }
    }

    /// True while a store is open
    pub fn is_open(&self) -> bool {
        self.progress.lock().is_some()
    }

    /// Close any open corpus, create a fresh store and start loading `path`
    pub async fn open(&self, path: PathBuf) -> Result<()> {
        self.close().await?;

        let config = self.config.clone();
        let store = tokio::task::spawn_blocking(move || Store::open_sqlite(&config))
            .await
            .map_err(|e| TmxError::Schema(format!("store creation panicked: {}", e)))??;
        *self.progress.lock() = Some(store.progress());
        *self.store.lock() = Some(store);
        info!("Session opened for {:?}", path);

        self.spawn(TaskKind::Load, move |store| {
            ingest::load_file(store, &path).map(|_| ())
        })
    }

    /// Start a corpus-wide operation in the background.
    ///
    /// Fails with `Busy` if another operation is still running.
    pub fn spawn<F>(&self, kind: TaskKind, op: F) -> Result<()>
    where
        F: FnOnce(&mut Store<SqliteBackend>) -> Result<()> + Send + 'static,
    {
        if !self.is_open() {
            return Err(TmxError::NoStore);
        }
        {
            let mut state = self.state.lock();
            if state.running {
                return Err(TmxError::Busy);
            }
            *state = TaskState {
                kind: Some(kind),
                running: true,
                error: None,
            };
        }

        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);
        let handle = tokio::task::spawn_blocking(move || {
            let result = {
                let mut guard = store.lock();
                match guard.as_mut() {
                    Some(store) => op(store),
                    None => Err(TmxError::NoStore),
                }
            };
            let mut state = state.lock();
            state.running = false;
            if let Err(e) = result {
                error!("{:?} task failed: {}", kind, e);
                state.error = Some(e.to_string());
            } else {
                debug!("{:?} task finished", kind);
            }
        });
        *self.task.lock() = Some(handle);
        Ok(())
    }

    /// Current status; `processed` follows the counter of the task kind
    pub fn status(&self) -> TaskStatus {
        let state = self.state.lock();
        let snapshot = self.progress().unwrap_or_default();
        let processed = match state.kind {
            Some(TaskKind::Load) => snapshot.count + snapshot.discarded,
            Some(TaskKind::Save) => snapshot.saved,
            Some(TaskKind::Export) => snapshot.exported,
            Some(TaskKind::Batch) => snapshot.processed,
            None => 0,
        };
        TaskStatus {
            running: state.running,
            error: state.error.clone(),
            processed,
        }
    }

    /// Raw counters of the open store
    pub fn progress(&self) -> Option<ProgressSnapshot> {
        self.progress.lock().as_ref().map(|p| p.snapshot())
    }

    /// Wait for the background task, if any
    pub async fn wait(&self) -> Result<()> {
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            handle
                .await
                .map_err(|e| TmxError::Schema(format!("background task panicked: {}", e)))?;
        }
        Ok(())
    }

    /// Run a foreground call against the open store
    pub fn with_store<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Store<SqliteBackend>) -> Result<T>,
    {
        if !self.is_open() {
            return Err(TmxError::NoStore);
        }
        let timeout = Duration::from_millis(self.config.lock_timeout_ms);
        let mut guard = self.store.try_lock_for(timeout).ok_or(TmxError::Busy)?;
        let store = guard.as_mut().ok_or(TmxError::NoStore)?;
        f(store)
    }

    /// Mark the store closing, let the running task fail fast, then drop the
    /// store and its database
    pub async fn close(&self) -> Result<()> {
        let progress = self.progress.lock().take();
        let Some(progress) = progress else {
            return Ok(());
        };
        progress.mark_closing();
        self.wait().await?;

        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || {
            let previous = store.lock().take();
            drop(previous);
        })
        .await
        .map_err(|e| TmxError::Schema(format!("store teardown panicked: {}", e)))?;
        info!("Session closed");
        Ok(())
    }
}

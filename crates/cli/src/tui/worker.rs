//! Background remote export.
//!
//! The viewer never blocks on the network: a remote export runs on its own
//! thread and reports back over a channel that the event loop drains.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use reconview_recon::export::ExportJob;
use reconview_recon::{Category, ExportError, ExportReport, RemoteExporter};

use crate::sink::DirectorySink;

pub(crate) type SharedRemote = Arc<dyn RemoteExporter + Send + Sync>;

pub(crate) struct ExportOutcome {
    /// Index of the table that started the export.
    pub table: usize,
    pub category: Category,
    pub result: Result<ExportReport, ExportError>,
}

pub(crate) struct ExportWorker {
    remote: SharedRemote,
    out_dir: PathBuf,
    tx: Sender<ExportOutcome>,
    rx: Receiver<ExportOutcome>,
    /// Export threads not yet joined.
    pending: Vec<JoinHandle<()>>,
}

impl ExportWorker {
    pub fn new(remote: SharedRemote, out_dir: PathBuf) -> Self {
        let (tx, rx) = mpsc::channel();
        Self { remote, out_dir, tx, rx, pending: Vec::new() }
    }

    pub fn out_dir(&self) -> &PathBuf {
        &self.out_dir
    }

    /// Run `job` remotely (with local fallback) on a new thread.
    pub fn spawn(&mut self, table: usize, job: ExportJob) {
        let remote = Arc::clone(&self.remote);
        let tx = self.tx.clone();
        let out_dir = self.out_dir.clone();
        let handle = thread::spawn(move || {
            let mut sink = DirectorySink::new(out_dir);
            let result = job.run_remote(remote.as_ref(), &mut sink);
            // Receiver gone means the viewer already exited.
            let _ = tx.send(ExportOutcome { table, category: job.category(), result });
        });
        self.pending.retain(|h| !h.is_finished());
        self.pending.push(handle);
    }

    pub fn has_pending(&self) -> bool {
        self.pending.iter().any(|h| !h.is_finished())
    }

    /// Block until every spawned export has finished and sent its outcome.
    pub fn join_pending(&mut self) {
        for handle in self.pending.drain(..) {
            if handle.join().is_err() {
                log::error!("export thread panicked");
            }
        }
    }

    pub fn try_recv(&self) -> Option<ExportOutcome> {
        self.rx.try_recv().ok()
    }
}

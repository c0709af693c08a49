use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::pipeline::{Generation, MonsterPipeline, PipelineError};
use crate::render::CancelToken;
use crate::scene::SceneConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub fn value(self) -> u64 {
        self.0
    }
}

enum WorkerCommand {
    Generate {
        id: RequestId,
        scene: Box<SceneConfig>,
        token: CancelToken,
    },
    Stop,
}

#[derive(Debug)]
pub struct GenerationResult {
    pub id: RequestId,
    pub outcome: Result<Generation, PipelineError>,
}

type PendingMap = Arc<Mutex<HashMap<RequestId, CancelToken>>>;

/// Runs generations on a background thread, one at a time in submission order.
/// Dropping the worker cancels outstanding requests and joins the thread.
pub struct GenerationWorker {
    tx_cmd: Sender<WorkerCommand>,
    rx_result: Receiver<GenerationResult>,
    pending: PendingMap,
    next_id: AtomicU64,
    thread_handle: Option<JoinHandle<()>>,
}

impl GenerationWorker {
    pub fn spawn(pipeline: MonsterPipeline) -> Self {
        let (tx_cmd, rx_cmd) = channel::unbounded::<WorkerCommand>();
        let (tx_result, rx_result) = channel::unbounded::<GenerationResult>();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let pending_clone = Arc::clone(&pending);

        let thread_handle = thread::spawn(move || {
            worker_thread(pipeline, rx_cmd, tx_result, pending_clone);
        });

        Self {
            tx_cmd,
            rx_result,
            pending,
            next_id: AtomicU64::new(1),
            thread_handle: Some(thread_handle),
        }
    }

    /// Queue a generation. The scene is copied; later edits by the caller do not
    /// affect the request.
    pub fn submit(&self, scene: &SceneConfig) -> RequestId {
        let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let token = CancelToken::new();
        self.pending.lock().insert(id, token.clone());
        if self
            .tx_cmd
            .send(WorkerCommand::Generate {
                id,
                scene: Box::new(scene.clone()),
                token,
            })
            .is_err()
        {
            warn!(id = id.0, "generation worker is gone");
            self.pending.lock().remove(&id);
        }
        id
    }

    /// Ask a queued or running request to stop. Returns false if it already
    /// finished.
    pub fn cancel(&self, id: RequestId) -> bool {
        match self.pending.lock().get(&id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn try_recv(&self) -> Option<GenerationResult> {
        self.rx_result.try_recv().ok()
    }

    pub fn recv(&self) -> Option<GenerationResult> {
        self.rx_result.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<GenerationResult> {
        match self.rx_result.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Drop for GenerationWorker {
    fn drop(&mut self) {
        for token in self.pending.lock().values() {
            token.cancel();
        }
        let _ = self.tx_cmd.send(WorkerCommand::Stop);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

fn worker_thread(
    pipeline: MonsterPipeline,
    rx_cmd: Receiver<WorkerCommand>,
    tx_result: Sender<GenerationResult>,
    pending: PendingMap,
) {
    loop {
        let cmd = match rx_cmd.recv() {
            Ok(c) => c,
            Err(_) => return,
        };

        match cmd {
            WorkerCommand::Generate { id, scene, token } => {
                let outcome = pipeline.generate_cancellable(&scene, &token);
                pending.lock().remove(&id);
                debug!(id = id.0, ok = outcome.is_ok(), "generation finished");
                // The receiver may already be gone during shutdown.
                let _ = tx_result.send(GenerationResult { id, outcome });
            }
            WorkerCommand::Stop => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::geometry::point::Point3d;
    use crate::scene::CameraPose;

    #[test]
    fn test_results_come_back_in_order() {
        let worker = GenerationWorker::spawn(MonsterPipeline::new(PipelineConfig::preview()));
        let broken = SceneConfig::new(CameraPose::at(Point3d::ORIGIN));
        let a = worker.submit(&broken);
        let b = worker.submit(&broken);
        assert!(a < b);

        let first = worker.recv_timeout(Duration::from_secs(10)).unwrap();
        let second = worker.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(first.id, a);
        assert_eq!(second.id, b);
        assert!(first.outcome.is_err());
        assert_eq!(worker.pending_count(), 0);
        assert!(!worker.cancel(a));
    }
}

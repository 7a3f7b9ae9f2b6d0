use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::time::Instant;

use super::{execute, Executor, Running, TaskKind, UnitOutcome, WorkOrder};
use crate::error::SupervisorError;
use crate::unit::Loader;

/// Runs each order on its own thread with a panic boundary.
///
/// A thread cannot be killed: on timeout it is detached and whatever it
/// eventually sends is dropped with the channel.
pub struct ThreadExecutor {
    loader: Arc<dyn Loader>,
}

impl ThreadExecutor {
    pub fn new(loader: Arc<dyn Loader>) -> Self {
        Self { loader }
    }
}

struct ThreadRunning {
    rx: Receiver<Result<UnitOutcome, String>>,
    kind: TaskKind,
    started: Instant,
}

impl Executor for ThreadExecutor {
    fn launch(&self, order: WorkOrder) -> Result<Box<dyn Running>, SupervisorError> {
        let (tx, rx) = mpsc::channel();
        let loader = Arc::clone(&self.loader);
        let kind = order.kind;
        std::thread::Builder::new()
            .name(format!("parity-{}", order.target))
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| execute(&order, loader.as_ref())))
                    .map_err(|payload| crate::unit::panic_message(payload.as_ref()));
                let _ = tx.send(result);
            })?;
        Ok(Box::new(ThreadRunning {
            rx,
            kind,
            started: Instant::now(),
        }))
    }
}

impl Running for ThreadRunning {
    fn poll(&mut self) -> Option<UnitOutcome> {
        match self.rx.try_recv() {
            Ok(Ok(outcome)) => Some(outcome),
            Ok(Err(message)) => Some(UnitOutcome::abandoned(
                self.kind,
                self.started.elapsed(),
                &format!("worker crashed: {}", message),
            )),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(UnitOutcome::abandoned(
                self.kind,
                self.started.elapsed(),
                "worker crashed: exited without a result",
            )),
        }
    }

    fn terminate(&mut self) {
        log::debug!("detaching timed-out worker thread");
    }
}

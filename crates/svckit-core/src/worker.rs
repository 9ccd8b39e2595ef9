//! Background work loop and cooperative cancellation
//!
//! The worker runs on its own thread. It waits for the poll interval or the
//! cancellation signal, whichever comes first, and performs one unit of work
//! per wake. A unit of work is never interrupted: cancellation is observed
//! only at the next wait.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Shared cancellation signal
///
/// Cheap to clone; all clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

#[derive(Debug, Default)]
struct TokenInner {
    cancelled: Mutex<bool>,
    cond: Condvar,
}

impl CancellationToken {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signal and wake every waiter
    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock();
        *cancelled = true;
        self.inner.cond.notify_all();
    }

    /// Check the signal without blocking
    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock()
    }

    /// Block until cancelled or `timeout` elapses.
    ///
    /// Returns `true` if the token was cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut cancelled = self.inner.cancelled.lock();
        while !*cancelled {
            if self.inner.cond.wait_until(&mut cancelled, deadline).timed_out() {
                break;
            }
        }
        *cancelled
    }

    /// Block until cancelled
    pub fn wait(&self) {
        let mut cancelled = self.inner.cancelled.lock();
        while !*cancelled {
            self.inner.cond.wait(&mut cancelled);
        }
    }
}

/// Body of a service
///
/// `initialize` runs once on the worker thread before the loop starts;
/// `run_once` is one unit of work.
pub trait Worker: Send {
    /// Prepare resources. A failure aborts the start.
    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    /// Perform one unit of work
    fn run_once(&mut self) -> Result<()>;

    /// Release resources after the loop exits
    fn finish(&mut self) {}
}

/// Creates a fresh worker for every start
pub trait WorkerFactory: Send {
    /// Build a new worker instance
    fn create(&mut self) -> Box<dyn Worker>;
}

impl<F> WorkerFactory for F
where
    F: FnMut() -> Box<dyn Worker> + Send,
{
    fn create(&mut self) -> Box<dyn Worker> {
        self()
    }
}

/// Outcome of waiting for worker initialization
#[derive(Debug)]
pub enum ReadyOutcome {
    /// The worker initialized and the loop is running
    Ready,
    /// Initialization failed; the thread has exited
    Failed(Error),
    /// No answer yet
    Pending,
}

/// Outcome of waiting on a worker thread
#[derive(Debug)]
pub enum JoinOutcome {
    /// The loop exited; carries its result
    Finished(Result<()>),
    /// The loop is still running after the timeout
    StillRunning,
}

/// Handle to a spawned work loop
pub struct WorkerHandle {
    cancel: CancellationToken,
    paused: Arc<AtomicBool>,
    ready: Option<Receiver<Result<()>>>,
    done: Receiver<Result<()>>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Spawn the loop on a new thread.
    ///
    /// The worker initializes on that thread; use [`WorkerHandle::wait_ready`]
    /// to learn the outcome.
    pub fn spawn(mut worker: Box<dyn Worker>, interval: Duration) -> Result<Self> {
        let cancel = CancellationToken::new();
        let paused = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<()>>(1);
        let (done_tx, done_rx) = mpsc::sync_channel::<Result<()>>(1);

        let loop_cancel = cancel.clone();
        let loop_paused = Arc::clone(&paused);
        let thread = thread::Builder::new()
            .name("svckit-worker".into())
            .spawn(move || {
                run_loop(worker.as_mut(), interval, &loop_cancel, &loop_paused, ready_tx, done_tx);
            })?;

        Ok(Self {
            cancel,
            paused,
            ready: Some(ready_rx),
            done: done_rx,
            thread: Some(thread),
        })
    }

    /// Wait up to `timeout` for the worker to finish initializing
    pub fn wait_ready(&mut self, timeout: Duration) -> ReadyOutcome {
        let Some(ready) = self.ready.as_ref() else {
            return ReadyOutcome::Ready;
        };

        match ready.recv_timeout(timeout) {
            Ok(Ok(())) => {
                self.ready = None;
                ReadyOutcome::Ready
            }
            Ok(Err(e)) => {
                self.ready = None;
                self.join_now();
                ReadyOutcome::Failed(Error::worker_fault(format!("initialization failed: {e}")))
            }
            Err(RecvTimeoutError::Timeout) => ReadyOutcome::Pending,
            Err(RecvTimeoutError::Disconnected) => {
                self.ready = None;
                self.join_now();
                ReadyOutcome::Failed(Error::worker_fault("worker exited during initialization"))
            }
        }
    }

    /// Give up on the worker: signal cancellation and detach the thread
    pub fn abandon(self) {
        self.cancel.cancel();
    }

    /// Cancellation signal observed by the loop
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Ask the loop to stop at its next wake
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Suspend or resume work units
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    /// Whether work units are suspended
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Wait up to `timeout` for the loop to exit
    pub fn join_timeout(&mut self, timeout: Duration) -> JoinOutcome {
        match self.done.recv_timeout(timeout) {
            Ok(result) => {
                self.reap();
                JoinOutcome::Finished(result)
            }
            Err(RecvTimeoutError::Timeout) => JoinOutcome::StillRunning,
            Err(RecvTimeoutError::Disconnected) => {
                self.reap();
                JoinOutcome::Finished(Err(Error::worker_fault("worker thread panicked")))
            }
        }
    }

    /// Non-blocking check whether the loop exited on its own
    pub fn try_join(&mut self) -> Option<Result<()>> {
        match self.done.try_recv() {
            Ok(result) => {
                self.reap();
                Some(result)
            }
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => {
                self.reap();
                Some(Err(Error::worker_fault("worker thread panicked")))
            }
        }
    }

    fn join_now(&mut self) {
        self.cancel.cancel();
        self.reap();
    }

    fn reap(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("paused", &self.is_paused())
            .finish()
    }
}

fn run_loop(
    worker: &mut dyn Worker,
    interval: Duration,
    cancel: &CancellationToken,
    paused: &AtomicBool,
    ready: SyncSender<Result<()>>,
    done: SyncSender<Result<()>>,
) {
    if let Err(e) = worker.initialize() {
        let _ = ready.send(Err(e));
        return;
    }
    if ready.send(Ok(())).is_err() {
        // Start gave up waiting; nobody will join us.
        worker.finish();
        return;
    }

    let mut result = Ok(());
    while !cancel.wait_timeout(interval) {
        if paused.load(Ordering::SeqCst) {
            continue;
        }
        if let Err(e) = worker.run_once() {
            result = Err(e);
            break;
        }
    }

    worker.finish();
    let _ = done.send(result);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct Counting {
        units: Arc<AtomicUsize>,
        unit_time: Duration,
    }

    impl Worker for Counting {
        fn run_once(&mut self) -> Result<()> {
            thread::sleep(self.unit_time);
            self.units.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingInit;

    impl Worker for FailingInit {
        fn initialize(&mut self) -> Result<()> {
            Err(Error::Config("missing resource".into()))
        }

        fn run_once(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn spawn_ready(worker: Box<dyn Worker>, interval: Duration) -> WorkerHandle {
        let mut handle = WorkerHandle::spawn(worker, interval).unwrap();
        assert!(matches!(
            handle.wait_ready(Duration::from_secs(5)),
            ReadyOutcome::Ready
        ));
        handle
    }

    #[test]
    fn test_token_wait_timeout() {
        let token = CancellationToken::new();
        assert!(!token.wait_timeout(Duration::from_millis(10)));
        token.cancel();
        assert!(token.wait_timeout(Duration::from_secs(5)));
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_token_wakes_waiter() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let t = thread::spawn(move || waiter.wait());
        thread::sleep(Duration::from_millis(20));
        token.cancel();
        t.join().unwrap();
    }

    #[test]
    fn test_loop_runs_units_until_cancelled() {
        let units = Arc::new(AtomicUsize::new(0));
        let worker = Counting {
            units: Arc::clone(&units),
            unit_time: Duration::ZERO,
        };
        let mut handle = spawn_ready(Box::new(worker), Duration::from_millis(5));

        thread::sleep(Duration::from_millis(100));
        handle.cancel();
        match handle.join_timeout(Duration::from_secs(5)) {
            JoinOutcome::Finished(result) => assert!(result.is_ok()),
            JoinOutcome::StillRunning => panic!("loop did not exit"),
        }
        assert!(units.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn test_cancel_before_first_wake_runs_nothing() {
        let units = Arc::new(AtomicUsize::new(0));
        let worker = Counting {
            units: Arc::clone(&units),
            unit_time: Duration::ZERO,
        };
        let mut handle = spawn_ready(Box::new(worker), Duration::from_secs(60));

        handle.cancel();
        assert!(matches!(
            handle.join_timeout(Duration::from_secs(5)),
            JoinOutcome::Finished(Ok(()))
        ));
        assert_eq!(units.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unit_in_flight_is_not_interrupted() {
        let units = Arc::new(AtomicUsize::new(0));
        let worker = Counting {
            units: Arc::clone(&units),
            unit_time: Duration::from_millis(200),
        };
        let mut handle = spawn_ready(Box::new(worker), Duration::from_millis(1));

        // Let the first unit begin, then cancel in the middle of it.
        thread::sleep(Duration::from_millis(50));
        handle.cancel();
        assert!(matches!(
            handle.join_timeout(Duration::from_secs(5)),
            JoinOutcome::Finished(Ok(()))
        ));
        assert_eq!(units.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_paused_loop_skips_units() {
        let units = Arc::new(AtomicUsize::new(0));
        let worker = Counting {
            units: Arc::clone(&units),
            unit_time: Duration::ZERO,
        };
        let mut handle = spawn_ready(Box::new(worker), Duration::from_millis(5));

        handle.set_paused(true);
        // A unit may already be in flight when the flag flips.
        thread::sleep(Duration::from_millis(20));
        let before = units.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(100));
        assert_eq!(units.load(Ordering::SeqCst), before);

        handle.cancel();
        let _ = handle.join_timeout(Duration::from_secs(5));
    }

    #[test]
    fn test_failed_initialization() {
        let mut handle = WorkerHandle::spawn(Box::new(FailingInit), Duration::from_millis(5)).unwrap();
        match handle.wait_ready(Duration::from_secs(5)) {
            ReadyOutcome::Failed(err) => {
                assert!(matches!(err, Error::WorkerFault(_)));
                assert!(err.to_string().contains("missing resource"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}

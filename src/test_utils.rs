//! Common testing infrastructure for connection tests.

use crate::{
    driver::{Driver, DriverError},
    params::ConnectParams,
};
use async_trait::async_trait;
use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex, Once,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio::sync::oneshot;

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "kestrel_docdb=debug".into());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

// --- Mock Driver ---

/// A driver whose outcomes are scripted by the test.
///
/// Unscripted calls succeed. `hold_next_open` parks the next open until the
/// returned sender fires, so tests can observe the `Connecting` state.
#[derive(Default)]
pub struct MockDriver {
    open_results: Mutex<VecDeque<Result<(), DriverError>>>,
    close_results: Mutex<VecDeque<Result<(), DriverError>>>,
    open_gate: Mutex<Option<oneshot::Receiver<()>>>,
    open_calls: AtomicUsize,
    close_calls: AtomicUsize,
    last_params: Mutex<Option<ConnectParams>>,
}

impl MockDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_next_open(&self, message: &str) {
        self.open_results
            .lock()
            .unwrap()
            .push_back(Err(DriverError::new(message)));
    }

    pub fn fail_next_close(&self, message: &str) {
        self.close_results
            .lock()
            .unwrap()
            .push_back(Err(DriverError::new(message)));
    }

    pub fn hold_next_open(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.open_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn last_params(&self) -> Option<ConnectParams> {
        self.last_params.lock().unwrap().clone()
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn open(&self, params: &ConnectParams) -> Result<(), DriverError> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_params.lock().unwrap() = Some(params.clone());

        let gate = self.open_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        self.open_results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.close_results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

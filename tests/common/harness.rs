//! tests/common/harness.rs
use async_trait::async_trait;
use kestrel_docdb::{
    Base, BaseModel, ConnectParams, Connection, Driver, DriverError, ModelConstructor,
};
use std::sync::{
    Arc, Mutex, Once,
    atomic::{AtomicUsize, Ordering},
};
use tracing_subscriber::fmt::format::FmtSpan;

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter = std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "kestrel_docdb=debug,lifecycle=info".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_test_writer()
            .init();
    });
}

/// A driver that succeeds unless told to refuse, and counts its calls.
#[derive(Default)]
pub struct ScriptedDriver {
    refuse_opens: AtomicUsize,
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub seen: Mutex<Vec<ConnectParams>>,
}

impl ScriptedDriver {
    /// Makes the next `n` opens fail.
    pub fn refuse_next_opens(&self, n: usize) {
        self.refuse_opens.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl Driver for ScriptedDriver {
    async fn open(&self, params: &ConnectParams) -> Result<(), DriverError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(params.clone());
        tokio::task::yield_now().await;

        let refused = self
            .refuse_opens
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(DriverError::new(format!(
                "connect ECONNREFUSED {}:{}",
                params.host, params.port
            )));
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(())
    }
}

/// A test harness holding a registry with a `User` model and one connection.
pub struct TestHarness {
    pub base: Arc<Base>,
    pub driver: Arc<ScriptedDriver>,
    pub conn: Arc<Connection>,
}

impl TestHarness {
    pub fn new() -> Self {
        init_tracing();
        let base = Base::new();
        base.define(
            BaseModel::builder("User")
                .method("email", |user, _| {
                    Ok(user.get("email").cloned().unwrap_or_default())
                })
                .static_fn("modelName", |ctor, _| Ok(ctor.model_name().into()))
                .build(),
        );
        let driver = Arc::new(ScriptedDriver::default());
        let conn = base.connection(driver.clone());
        Self { base, driver, conn }
    }
}

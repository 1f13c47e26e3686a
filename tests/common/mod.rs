/// 集成测试共用的内存连接池
///
/// 记录获取、执行、归还的次数，以及每次执行的 SQL 与参数。
#[allow(dead_code)]
pub mod fake {
    use async_trait::async_trait;
    use sqlsink::error::BackendError;
    use sqlsink::pool::{ConnectionPool, PooledConnection};
    use sqlsink::schema::Dialect;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// 连接池的行为
    #[derive(Debug, Clone)]
    pub enum Behavior {
        Succeed,
        FailAcquire(String),
        FailExecute(String),
        SlowAcquire(Duration),
        SlowExecute(Duration),
    }

    #[derive(Debug, Default)]
    pub struct Calls {
        pub acquired: AtomicUsize,
        pub released: AtomicUsize,
        pub executed: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl Calls {
        pub fn acquired(&self) -> usize {
            self.acquired.load(Ordering::SeqCst)
        }

        pub fn released(&self) -> usize {
            self.released.load(Ordering::SeqCst)
        }

        pub fn executions(&self) -> Vec<(String, Vec<String>)> {
            self.executed.lock().unwrap().clone()
        }
    }

    #[derive(Debug)]
    pub struct FakePool {
        pub calls: Arc<Calls>,
        behavior: Behavior,
        dialect: Dialect,
    }

    impl FakePool {
        pub fn new(behavior: Behavior) -> Self {
            Self {
                calls: Arc::new(Calls::default()),
                behavior,
                dialect: Dialect::Question,
            }
        }

        pub fn succeed() -> Self {
            Self::new(Behavior::Succeed)
        }

        #[must_use]
        pub fn with_dialect(mut self, dialect: Dialect) -> Self {
            self.dialect = dialect;
            self
        }
    }

    #[derive(Debug)]
    pub struct FakeConnection {
        calls: Arc<Calls>,
        behavior: Behavior,
    }

    #[async_trait]
    impl ConnectionPool for FakePool {
        type Connection = FakeConnection;

        async fn get_connection(&self) -> Result<FakeConnection, BackendError> {
            match &self.behavior {
                Behavior::FailAcquire(reason) => return Err(BackendError::new(reason.clone())),
                Behavior::SlowAcquire(delay) => tokio::time::sleep(*delay).await,
                _ => {}
            }
            self.calls.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(FakeConnection {
                calls: Arc::clone(&self.calls),
                behavior: self.behavior.clone(),
            })
        }

        fn dialect(&self) -> Dialect {
            self.dialect
        }
    }

    #[async_trait]
    impl PooledConnection for FakeConnection {
        async fn execute(&mut self, sql: &str, params: &[String]) -> Result<u64, BackendError> {
            if let Behavior::SlowExecute(delay) = &self.behavior {
                tokio::time::sleep(*delay).await;
            }
            self.calls
                .executed
                .lock()
                .unwrap()
                .push((sql.to_string(), params.to_vec()));
            match &self.behavior {
                Behavior::FailExecute(reason) => Err(BackendError::new(reason.clone())),
                _ => Ok(1),
            }
        }

        fn disconnect(self) {
            self.calls.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

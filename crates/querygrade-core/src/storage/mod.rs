pub mod executor;
pub mod pool;

pub use executor::{Executor, SqliteExecutor};
pub use pool::{ConnectionPool, PoolSettings, PoolStatus, PooledConnection};

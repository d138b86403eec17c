//! The global pool used by `fork` outside of any pool thread.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::executor::ForkJoinPool;
use parking_lot::RwLock;
use std::sync::Arc;

static GLOBAL_POOL: RwLock<Option<Arc<ForkJoinPool>>> = RwLock::new(None);

/// Initializes the global pool from [`Config::from_env`].
pub fn init() -> Result<()> {
    init_with_config(Config::from_env()?)
}

pub fn init_with_config(config: Config) -> Result<()> {
    let mut global = GLOBAL_POOL.write();

    if global.is_some() {
        return Err(Error::AlreadyInitialized);
    }

    *global = Some(Arc::new(ForkJoinPool::new(config)?));
    Ok(())
}

/// The global pool, created from [`Config::from_env`] on first use.
pub fn global_pool() -> Result<Arc<ForkJoinPool>> {
    if let Some(pool) = GLOBAL_POOL.read().as_ref() {
        return Ok(pool.clone());
    }

    let mut global = GLOBAL_POOL.write();
    if let Some(pool) = global.as_ref() {
        return Ok(pool.clone());
    }

    let pool = Arc::new(ForkJoinPool::new(Config::from_env()?)?);
    *global = Some(pool.clone());
    Ok(pool)
}

/// Shuts the global pool down, draining its work. A later [`init`] or
/// [`global_pool`] call starts a fresh one.
pub fn shutdown() {
    let pool = GLOBAL_POOL.write().take();

    if let Some(pool) = pool {
        pool.shutdown();
    }
}

use crate::error::{Error, Result};
use crate::executor::PanicStrategy;
use std::time::Duration;

/// Upper bound on the worker count accepted by [`Config::validate`].
pub const MAX_THREADS: usize = 1024;

/// Environment variable overriding the worker count.
pub const ENV_NUM_THREADS: &str = "FORKJOIN_NUM_THREADS";

/// Environment variable selecting the victim selection policy.
pub const ENV_STEAL_POLICY: &str = "FORKJOIN_STEAL_POLICY";

/// How an idle worker chooses which other worker to steal from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StealPolicy {
    /// Visit the other workers in a freshly shuffled order on every attempt.
    #[default]
    Random,
    /// Visit the other workers in index order, starting after self.
    RoundRobin,
}

impl std::str::FromStr for StealPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(StealPolicy::Random),
            "round-robin" | "round_robin" | "roundrobin" => Ok(StealPolicy::RoundRobin),
            other => Err(Error::config(format!("unknown steal policy '{}'", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub num_threads: Option<usize>,
    pub steal_policy: StealPolicy,
    pub panic_strategy: PanicStrategy,
    pub pin_workers: bool,
    pub stack_size: Option<usize>,
    pub thread_name_prefix: String,
    /// Longest time a parked idle worker sleeps before re-checking the
    /// queues. Pushes wake sleepers directly; this only bounds a wakeup
    /// that races with a worker going to sleep.
    pub idle_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_threads: None,
            steal_policy: StealPolicy::default(),
            panic_strategy: PanicStrategy::default(),
            pin_workers: false,
            stack_size: Some(2 * 1024 * 1024),
            thread_name_prefix: "forkjoin-worker".to_string(),
            idle_timeout: Duration::from_millis(20),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Default config overlaid with `FORKJOIN_NUM_THREADS` and
    /// `FORKJOIN_STEAL_POLICY` when they are set.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(raw) = std::env::var(ENV_NUM_THREADS) {
            let n = raw.trim().parse::<usize>().map_err(|e| {
                Error::config(format!("{}='{}': {}", ENV_NUM_THREADS, raw, e))
            })?;
            config.num_threads = Some(n);
        }

        if let Ok(raw) = std::env::var(ENV_STEAL_POLICY) {
            config.steal_policy = raw.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.num_threads {
            if n == 0 {
                return Err(Error::config("num_threads must be > 0"));
            }
            if n > MAX_THREADS {
                return Err(Error::config(format!(
                    "num_threads too large (max {})",
                    MAX_THREADS
                )));
            }
        }

        if self.idle_timeout.is_zero() {
            return Err(Error::config("idle_timeout must be > 0"));
        }

        if let Some(size) = self.stack_size {
            if size == 0 {
                return Err(Error::config("stack_size must be > 0"));
            }
        }

        Ok(())
    }

    pub fn worker_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(num_cpus::get)
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn num_threads(mut self, n: usize) -> Self {
        self.config.num_threads = Some(n);
        self
    }

    pub fn steal_policy(mut self, policy: StealPolicy) -> Self {
        self.config.steal_policy = policy;
        self
    }

    pub fn panic_strategy(mut self, strategy: PanicStrategy) -> Self {
        self.config.panic_strategy = strategy;
        self
    }

    pub fn pin_workers(mut self, pin: bool) -> Self {
        self.config.pin_workers = pin;
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

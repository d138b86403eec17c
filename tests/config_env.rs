use forkjoin::config::{ENV_NUM_THREADS, ENV_STEAL_POLICY};
use forkjoin::prelude::*;

// Environment variables are process-wide, so this file holds a single test.
#[test]
fn test_config_from_env() {
    std::env::remove_var(ENV_NUM_THREADS);
    std::env::remove_var(ENV_STEAL_POLICY);
    let config = Config::from_env().unwrap();
    assert_eq!(config.num_threads, None);
    assert_eq!(config.steal_policy, StealPolicy::Random);

    std::env::set_var(ENV_NUM_THREADS, "3");
    std::env::set_var(ENV_STEAL_POLICY, "round-robin");
    let config = Config::from_env().unwrap();
    assert_eq!(config.worker_threads(), 3);
    assert_eq!(config.steal_policy, StealPolicy::RoundRobin);

    std::env::set_var(ENV_NUM_THREADS, "0");
    assert!(matches!(Config::from_env(), Err(Error::Config(_))));

    std::env::set_var(ENV_NUM_THREADS, "many");
    assert!(matches!(Config::from_env(), Err(Error::Config(_))));

    std::env::remove_var(ENV_NUM_THREADS);
    std::env::remove_var(ENV_STEAL_POLICY);
}

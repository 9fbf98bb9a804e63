use rho_config::ConfigResolver;
use rho_events::ActionLog;

use crate::rate_limit::RateLimiter;

/// State owned by the service root and threaded into every orchestrated
/// operation. Never a process-wide global, so each test can build an
/// isolated instance.
#[derive(Debug)]
pub struct ServiceContext {
    resolver: ConfigResolver,
    rate_limiter: RateLimiter,
    action_log: ActionLog,
    mock_generator: bool,
}

impl ServiceContext {
    /// `mock_generator` forces the deterministic mock backend regardless
    /// of the configured provider.
    pub fn new(resolver: ConfigResolver, action_log: ActionLog, mock_generator: bool) -> Self {
        Self {
            resolver,
            rate_limiter: RateLimiter::new(),
            action_log,
            mock_generator,
        }
    }

    pub fn resolver(&self) -> &ConfigResolver {
        &self.resolver
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn action_log(&self) -> &ActionLog {
        &self.action_log
    }

    pub fn mock_generator(&self) -> bool {
        self.mock_generator
    }
}

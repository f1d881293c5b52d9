//! Memory watchdog: periodic checkpoints during the parse pass that
//! drop stale AST cache entries and trim the cache when the process
//! grows past the RSS threshold.

use std::time::Duration;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::state::AstCache;

pub struct MemoryWatchdog {
    system: System,
    pid: Pid,
    threshold_mb: u64,
    check_interval: usize,
    ast_ttl: Duration,
    counter: usize,
}

impl MemoryWatchdog {
    pub fn new(threshold_mb: u64, check_interval: usize, ast_ttl_seconds: u64) -> Self {
        Self {
            system: System::new(),
            pid: Pid::from_u32(std::process::id()),
            threshold_mb,
            check_interval: check_interval.max(1),
            ast_ttl: Duration::from_secs(ast_ttl_seconds.max(1)),
            counter: 0,
        }
    }

    /// Called once per processed file; every `check_interval` calls the
    /// cache ages out, the process RSS is measured, and the cache is
    /// trimmed if needed.
    pub fn checkpoint(&mut self, ast_cache: &mut AstCache) {
        self.counter += 1;
        if self.counter % self.check_interval != 0 {
            return;
        }

        let stale = ast_cache.purge_stale(self.ast_ttl);
        if stale > 0 {
            tracing::debug!("Aged out {stale} cached ASTs");
        }

        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);
        let Some(process) = self.system.process(self.pid) else {
            return;
        };
        let rss_mb = process.memory() / (1024 * 1024);
        if rss_mb <= self.threshold_mb {
            return;
        }

        let target = ast_cache.len() / 2;
        let evicted = ast_cache.evict_lru_to(target);
        tracing::warn!(
            "Memory checkpoint: {rss_mb} MB RSS over {} MB threshold, evicted {evicted} cached ASTs",
            self.threshold_mb
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_below_threshold_keeps_cache() {
        let mut watchdog = MemoryWatchdog::new(u64::MAX / (1024 * 1024), 1, 3600);
        let mut cache = AstCache::new();
        watchdog.checkpoint(&mut cache);
        assert_eq!(cache.len(), 0);
    }
}

use super::spool::SpoolDir;
use crate::error::Result;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Consumes artifacts: anything left in the spool longer than `delay` after
/// the janitor first noticed it gets deleted.
pub struct Janitor {
    spool: SpoolDir,
    delay: Duration,
    first_seen: HashMap<String, Instant>,
}

impl Janitor {
    pub fn new(spool: SpoolDir, delay: Duration) -> Self {
        Janitor {
            spool,
            delay,
            first_seen: HashMap::new(),
        }
    }

    /// One pass over the spool. Returns how many artifacts were removed.
    pub fn sweep(&mut self, now: Instant) -> Result<usize> {
        let present = self.spool.list_artifacts()?;
        let mut removed = 0;
        let mut still_here = HashMap::with_capacity(present.len());

        for (name, _) in present {
            let seen_at = self.first_seen.get(&name).copied().unwrap_or(now);
            if now.saturating_duration_since(seen_at) < self.delay {
                still_here.insert(name, seen_at);
                continue;
            }
            match std::fs::remove_file(self.spool.path().join(&name)) {
                Ok(()) => {
                    debug!(artifact = %name, "consumed artifact");
                    removed += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(artifact = %name, error = %e, "failed to remove artifact");
                    still_here.insert(name, seen_at);
                }
            }
        }

        self.first_seen = still_here;
        Ok(removed)
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            spool = %self.spool.path().display(),
            delay = %humantime::format_duration(self.delay),
            "janitor started"
        );
        // Sweep often enough that nothing outlives its delay by much.
        let period = (self.delay / 4).max(Duration::from_millis(50));
        let mut ticker = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if let Err(e) = self.sweep(Instant::now()) {
                warn!(error = %e, "janitor sweep failed");
            }
        }
        debug!("janitor cancelled");
    }
}

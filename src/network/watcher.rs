use super::spool::{read_artifact, SpoolDir};
use super::ArtifactKind;
use crate::error::Result;
use crate::sync::{Inbound, InboundSender};
use std::collections::HashSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Polls the spool and hands every new artifact to the node, once.
pub struct SpoolWatcher {
    spool: SpoolDir,
    poll_interval: Duration,
    /// Artifacts already delivered that are still present in the spool.
    seen: HashSet<String>,
}

impl SpoolWatcher {
    pub fn new(spool: SpoolDir, poll_interval: Duration) -> Self {
        SpoolWatcher {
            spool,
            poll_interval,
            seen: HashSet::new(),
        }
    }

    /// Treat everything already in the spool as old news.
    pub fn prime(&mut self) -> Result<usize> {
        let present = self.spool.list_artifacts()?;
        let count = present.len();
        self.seen.extend(present.into_iter().map(|(name, _)| name));
        Ok(count)
    }

    /// Read artifacts that appeared since the last poll. Unreadable or
    /// malformed ones are logged and dropped.
    pub async fn poll_once(&mut self) -> Result<Vec<Inbound>> {
        let mut present = HashSet::new();
        let mut fresh = Vec::new();

        let mut entries = tokio::fs::read_dir(self.spool.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let Some(kind) = ArtifactKind::from_name(&name) else {
                continue;
            };
            if !self.seen.contains(&name) {
                fresh.push((name.clone(), kind, entry.path()));
            }
            present.insert(name);
        }
        fresh.sort_by(|a, b| a.0.cmp(&b.0));

        let mut delivered = Vec::with_capacity(fresh.len());
        for (name, kind, path) in fresh {
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(artifact = %name, "artifact consumed before it was read");
                    continue;
                }
                Err(e) => {
                    warn!(artifact = %name, error = %e, "failed to read artifact");
                    continue;
                }
            };
            match read_artifact(&name, kind, &bytes) {
                Ok(inbound) => delivered.push(inbound),
                Err(e) => warn!(error = %e, "dropping artifact"),
            }
        }

        // Forget what the janitor removed so the set stays bounded.
        self.seen = present;
        Ok(delivered)
    }

    pub async fn run(mut self, sender: InboundSender, cancel: CancellationToken) {
        info!(spool = %self.spool.path().display(), "watching spool");
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let inbound = match self.poll_once().await {
                Ok(inbound) => inbound,
                Err(e) => {
                    warn!(error = %e, "spool poll failed");
                    continue;
                }
            };
            for message in inbound {
                if !sender.submit(message) {
                    debug!("node stopped; watcher exiting");
                    return;
                }
            }
        }
        debug!("watcher cancelled");
    }
}

use super::{
    block_artifact_name, decode_chain, decode_transaction, encode_chain, ArtifactKind,
    GossipPort, TRANSACTION_SUFFIX,
};
use crate::blockchain::Block;
use crate::error::{ChainError, Result};
use crate::sync::{CandidateChain, Inbound};
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A spool directory shared by every node on the host.
#[derive(Debug, Clone)]
pub struct SpoolDir {
    path: PathBuf,
}

impl SpoolDir {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_dir() {
            return Err(ChainError::SpoolUnavailable(format!(
                "{} is not a directory",
                path.display()
            )));
        }
        Ok(SpoolDir { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write through a hidden temp file and rename, so watchers never see a
    /// partial artifact.
    pub fn write_artifact(&self, name: &str, contents: &[u8]) -> Result<PathBuf> {
        let target = self.path.join(name);
        let temp = self.path.join(format!(".{}.tmp", name));
        fs::write(&temp, contents)?;
        if let Err(e) = fs::rename(&temp, &target) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        debug!(artifact = name, bytes = contents.len(), "wrote artifact");
        Ok(target)
    }

    pub fn write_chain(&self, chain: &[Block]) -> Result<PathBuf> {
        let tip = chain.last().ok_or(ChainError::EmptyChain)?;
        let encoded = encode_chain(chain)?;
        self.write_artifact(&block_artifact_name(tip.hash()), encoded.as_bytes())
    }

    pub fn write_transaction(&self, text: &str) -> Result<PathBuf> {
        let name = format!(
            "{}-{:08x}{}",
            chrono::Utc::now().timestamp_millis(),
            rand::thread_rng().gen::<u32>(),
            TRANSACTION_SUFFIX
        );
        self.write_artifact(&name, text.as_bytes())
    }

    /// Names of the artifacts currently present, with their kind.
    pub fn list_artifacts(&self) -> Result<Vec<(String, ArtifactKind)>> {
        let mut found = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if let Some(kind) = ArtifactKind::from_name(&name) {
                found.push((name, kind));
            }
        }
        found.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(found)
    }
}

/// Parse one artifact's bytes into an inbound message.
pub fn read_artifact(name: &str, kind: ArtifactKind, bytes: &[u8]) -> Result<Inbound> {
    Ok(match kind {
        ArtifactKind::Block => Inbound::Chain(CandidateChain {
            source: name.to_string(),
            blocks: decode_chain(name, bytes)?,
        }),
        ArtifactKind::Transaction => Inbound::Transaction {
            source: name.to_string(),
            text: decode_transaction(name, bytes)?,
        },
    })
}

impl GossipPort for SpoolDir {
    fn publish_chain(&mut self, chain: &[Block]) -> Result<()> {
        self.write_chain(chain).map(|_| ())
    }
}

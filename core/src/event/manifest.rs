use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeEntry {
    /// Challenge binaries in distribution order.
    pub cbs: Vec<String>,
    /// Packet capture file name; empty when the challenge ships none.
    #[serde(default)]
    pub pcap: String,
}

impl ChallengeEntry {
    pub fn pcap(&self) -> Option<&str> {
        if self.pcap.is_empty() {
            None
        } else {
            Some(&self.pcap)
        }
    }
}

/// CSID -> challenge contents, as shipped inside an event distribution bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventManifest {
    pub challenges: BTreeMap<String, ChallengeEntry>,
}

impl EventManifest {
    pub fn from_slice(bytes: &[u8]) -> CoreResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.is_file() {
            return Err(CoreError::resource(
                path,
                "cannot find the manifest file; did archive extraction fail?",
            ));
        }
        let bytes = std::fs::read(path)?;
        Self::from_slice(&bytes)
    }

    pub fn get(&self, csid: &str) -> Option<&ChallengeEntry> {
        self.challenges.get(csid)
    }

    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }

    /// Human-readable listing, one block per challenge set.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut out = vec!["Challenges in this bundle:".to_string()];
        for (csid, entry) in &self.challenges {
            out.push(format!("CSID: {}", csid));
            out.push(format!("\tCBs: {}", entry.cbs.join(", ")));
            out.push(format!("\tpcap: {}", entry.pcap().unwrap_or("None")));
        }
        out
    }
}

//! Reconciliation plans and their digests
//!
//! A preview prints the plan and its digest; an apply run recomputes the plan
//! and refuses to touch anything unless the digest still matches, so the
//! destructive run does exactly what the operator reviewed.

use crate::db::DuplicateGroup;
use crate::natural_key::NaturalKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Every merge an apply run would perform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationPlan {
    pub key: NaturalKey,
    pub groups: Vec<DuplicateGroup>,
}

impl ReconciliationPlan {
    pub fn new(key: NaturalKey, groups: Vec<DuplicateGroup>) -> Self {
        Self { key, groups }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Meetings an apply run would delete
    pub fn deletions(&self) -> usize {
        self.groups.iter().map(|g| g.losers().len()).sum()
    }

    /// Hex SHA-256 over the key name and, per group, its key values, survivor and losers
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.key.as_str().as_bytes());
        hasher.update(b"\n");

        for group in &self.groups {
            hasher.update(group.key_values.join("\u{1f}").as_bytes());
            hasher.update(b"|");
            hasher.update(group.survivor().id.as_bytes());
            for loser in group.losers() {
                hasher.update(b",");
                hasher.update(loser.id.as_bytes());
            }
            hasher.update(b"\n");
        }

        format!("{:x}", hasher.finalize())
    }
}

impl fmt::Display for ReconciliationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Natural key '{}': {} duplicate group(s), {} meeting(s) to delete",
            self.key,
            self.groups.len(),
            self.deletions()
        )?;

        for group in &self.groups {
            writeln!(f, "  [{}]", group.key_values.join(" | "))?;
            let survivor = group.survivor();
            writeln!(f, "    keep   {} (created {})", survivor.id, survivor.created_at)?;
            for loser in group.losers() {
                writeln!(f, "    delete {} (created {})", loser.id, loser.created_at)?;
            }
        }

        writeln!(f, "Plan digest: {}", self.digest())
    }
}

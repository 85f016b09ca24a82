//! Resume tracking over the durable output.
//!
//! The set of processed source URLs is rebuilt from the output store at
//! startup and only grows during a run.

use std::collections::HashSet;

use tracing::info;

use portscout_shared::Result;

use crate::boundary::ProcessedSource;

/// Source URLs that already have output, plus those finished this run.
#[derive(Debug, Default, Clone)]
pub struct ResumeTracker {
    processed: HashSet<String>,
}

impl ResumeTracker {
    /// Build the tracker from whatever the output store already holds.
    pub fn load(source: &dyn ProcessedSource) -> Result<Self> {
        let processed = source.load_processed()?;
        info!(processed = processed.len(), "loaded resume checkpoint");
        Ok(Self { processed })
    }

    pub fn from_processed(processed: HashSet<String>) -> Self {
        Self { processed }
    }

    pub fn is_processed(&self, url: &str) -> bool {
        self.processed.contains(key(url))
    }

    pub fn mark_processed(&mut self, url: &str) {
        self.processed.insert(key(url).to_string());
    }

    pub fn len(&self) -> usize {
        self.processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }

    /// URLs still to process, in input order, each at most once.
    pub fn filter<I, S>(&self, input: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        input
            .into_iter()
            .map(|u| key(u.as_ref()).to_string())
            .filter(|u| !u.is_empty())
            .filter(|u| !self.processed.contains(u))
            .filter(|u| seen.insert(u.clone()))
            .collect()
    }
}

fn key(url: &str) -> &str {
    url.trim()
}

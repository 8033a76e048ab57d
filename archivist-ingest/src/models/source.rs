//! Sources of a run

use serde::{Deserialize, Serialize};

/// A source URL and its processing position. Lives only for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub ordinal: usize,
    pub url: String,
}

impl Source {
    pub fn new(ordinal: usize, url: impl Into<String>) -> Self {
        Self {
            ordinal,
            url: url.into(),
        }
    }

    /// Number URLs in the order given; that order is the processing order
    pub fn from_urls<I, S>(urls: I) -> Vec<Source>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        urls.into_iter()
            .enumerate()
            .map(|(ordinal, url)| Source::new(ordinal, url))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_urls_keeps_order() {
        let sources = Source::from_urls(["b", "a", "c"]);
        let urls: Vec<&str> = sources.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["b", "a", "c"]);
        assert_eq!(sources[2].ordinal, 2);
    }
}

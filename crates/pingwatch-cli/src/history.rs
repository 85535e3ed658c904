/// Recently monitored hosts, most recent first, persisted as a JSON array.
use std::path::PathBuf;

use anyhow::Context;
use pingwatch_core::HISTORY_CAPACITY;

#[derive(Debug, Clone)]
pub struct HostHistory {
    path: PathBuf,
    hosts: Vec<String>,
}

impl HostHistory {
    /// Load from `path`. A missing or unreadable file yields an empty list.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let hosts = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Vec<String>>(&text) {
                Ok(mut hosts) => {
                    hosts.truncate(HISTORY_CAPACITY);
                    hosts
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable host history");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        Self { path, hosts }
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Host at a 1-based position, as listed to the user.
    pub fn get(&self, position: usize) -> Option<&str> {
        position
            .checked_sub(1)
            .and_then(|i| self.hosts.get(i))
            .map(String::as_str)
    }

    /// Move `host` to the front, inserting it if new; the oldest entry falls
    /// off past capacity.
    pub fn touch(&mut self, host: &str) {
        self.hosts.retain(|h| h != host);
        self.hosts.insert(0, host.to_string());
        self.hosts.truncate(HISTORY_CAPACITY);
    }

    /// Returns false when the host was not listed.
    pub fn remove(&mut self, host: &str) -> bool {
        let before = self.hosts.len();
        self.hosts.retain(|h| h != host);
        self.hosts.len() != before
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(&self.hosts)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("writing host history to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_orders_most_recent_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = HostHistory::load(dir.path().join("h.json"));
        history.touch("a");
        history.touch("b");
        history.touch("a");
        assert_eq!(history.hosts(), ["a", "b"]);
        assert_eq!(history.get(1), Some("a"));
        assert_eq!(history.get(0), None);
        assert_eq!(history.get(3), None);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = HostHistory::load(dir.path().join("h.json"));
        for i in 0..12 {
            history.touch(&format!("10.0.0.{}", i));
        }
        assert_eq!(history.hosts().len(), HISTORY_CAPACITY);
        assert_eq!(history.get(1), Some("10.0.0.11"));
        assert!(!history.hosts().contains(&"10.0.0.2".to_string()));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("history.json");
        let mut history = HostHistory::load(&path);
        history.touch("8.8.8.8");
        history.touch("example.com");
        history.save().unwrap();

        let reloaded = HostHistory::load(&path);
        assert_eq!(reloaded.hosts(), ["example.com", "8.8.8.8"]);
    }

    #[test]
    fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = HostHistory::load(dir.path().join("h.json"));
        history.touch("a");
        assert!(history.remove("a"));
        assert!(!history.remove("a"));
        assert!(history.is_empty());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(HostHistory::load(&path).is_empty());
    }
}

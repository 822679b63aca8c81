use serde::{Deserialize, Serialize};
use std::fmt;

/// Named host threads known to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostThread {
    /// Dispatch thread receiving script requests
    Ui,
    /// Worker thread owning network and storage state
    Io,
}

impl HostThread {
    pub const ALL: [HostThread; 2] = [HostThread::Ui, HostThread::Io];

    pub fn as_str(&self) -> &'static str {
        match self {
            HostThread::Ui => "ui",
            HostThread::Io => "io",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            HostThread::Ui => 0,
            HostThread::Io => 1,
        }
    }
}

impl fmt::Display for HostThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_are_distinct() {
        let indices: Vec<usize> = HostThread::ALL.iter().map(|t| t.index()).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&HostThread::Io).unwrap(), "\"io\"");
        let ui: HostThread = serde_json::from_str("\"ui\"").unwrap();
        assert_eq!(ui, HostThread::Ui);
    }
}

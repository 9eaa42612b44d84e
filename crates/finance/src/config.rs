use serde::Deserialize;

/// Defaults for read operations whose callers may omit a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub candidate_limit: u32,
    pub ledger_limit: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            candidate_limit: 5,
            ledger_limit: 10,
        }
    }
}

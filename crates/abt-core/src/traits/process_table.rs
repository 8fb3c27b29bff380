//! Process table abstraction

/// One process as seen at scan time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSnapshot {
    /// Process ID
    pub pid: u32,
    /// Numeric owner, if the platform reports one
    pub uid: Option<String>,
    /// Full argument vector, program first
    pub cmd: Vec<String>,
}

/// Source of process snapshots
///
/// The registry only ever reads through this trait, so scans can be driven
/// by a fixed list in tests.
pub trait ProcessTable {
    /// Owner of the current process, used to scope scans to one user
    fn current_uid(&self) -> Option<String>;

    /// Every process visible right now
    fn processes(&self) -> Vec<ProcessSnapshot>;
}

use std::collections::HashMap;
use std::env as stdenv;
use std::ffi::OsString;
use std::path::PathBuf;

/// Variables and working directory every probed tool is started with.
///
/// Captured once from the scraper's own process, so probes inherit its environment.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Variables passed to the probed tool (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// Working directory of the probed tool; relative tool paths resolve against it.
    pub current_dir: PathBuf,
}

impl Environment {
    /// Snapshot of the current process environment and working directory.
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { vars, current_dir }
    }

    /// Value of `key`, falling back to the live process environment.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// Directories searched for a bare tool name, as an OS-level PATH string.
    pub fn search_paths(&self) -> OsString {
        self.get_var("PATH").map(OsString::from).unwrap_or_default()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

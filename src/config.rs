use std::time::Duration;

/// How deep below the tool the builder descends by default.
pub const DEFAULT_MAX_DEPTH: usize = 10;
/// Wall-clock budget of one probe by default.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_HELP_FLAG: &str = "--help";

/// Policy values of one scrape run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeConfig {
    /// Deepest command depth that is still probed; the tool itself is depth 0.
    pub max_depth: usize,
    /// Probes running longer than this are killed and reported as timed out.
    pub timeout: Duration,
    /// Flag appended to every command path to make the tool print its help.
    pub help_flag: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            timeout: DEFAULT_TIMEOUT,
            help_flag: DEFAULT_HELP_FLAG.to_string(),
        }
    }
}

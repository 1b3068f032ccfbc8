use crate::command::CommandPath;
use std::time::Duration;
use thiserror::Error;

/// Why a single probe produced no usable help text.
///
/// Below the root every variant is absorbed into a stub node; only a root
/// failure escalates into [`BuildError::RootUnavailable`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    /// The tool did not exit before the wall-clock budget ran out.
    #[error("`{path}` did not finish within {after:?}")]
    Timeout { path: CommandPath, after: Duration },
    /// The executable could not be resolved or started.
    #[error("failed to launch `{path}`: {reason}")]
    LaunchError { path: CommandPath, reason: String },
    /// The tool ran but printed nothing besides whitespace.
    #[error("`{path}` printed no help output")]
    Empty { path: CommandPath },
}

impl ProbeFailure {
    pub fn path(&self) -> &CommandPath {
        match self {
            ProbeFailure::Timeout { path, .. }
            | ProbeFailure::LaunchError { path, .. }
            | ProbeFailure::Empty { path } => path,
        }
    }
}

/// Terminal failure of a whole build.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to retrieve the command structure of `{tool}`")]
    RootUnavailable {
        tool: String,
        #[source]
        source: ProbeFailure,
    },
}

use crate::error::ProbeFailure;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered tokens from the tool name down to one of its (sub)commands,
/// e.g. `["avalanche", "blockchain", "create"]`.
///
/// The path is the identity of a command during a build: two probes with an
/// equal path are never both executed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandPath(Vec<String>);

impl CommandPath {
    /// Path of the tool itself.
    pub fn root(tool: impl Into<String>) -> Self {
        Self(vec![tool.into()])
    }

    /// Path of the subcommand `name` below `self`.
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut tokens = self.0.clone();
        tokens.push(name.into());
        Self(tokens)
    }

    /// Name (or path) of the executable.
    pub fn tool(&self) -> &str {
        &self.0[0]
    }

    /// Tokens passed to the executable, i.e. everything after the tool name.
    pub fn args(&self) -> &[String] {
        &self.0[1..]
    }

    /// Number of subcommand tokens below the tool; the tool itself is depth 0.
    pub fn depth(&self) -> usize {
        self.0.len() - 1
    }
}

impl fmt::Display for CommandPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

/// One flag line as discovered in a help block.
///
/// `names` keeps every alias as it was printed, e.g. `-h, --help`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
    #[serde(rename = "flag")]
    pub names: String,
    pub description: String,
}

impl Flag {
    pub fn new(names: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            names: names.into(),
            description: description.into(),
        }
    }
}

/// A node of the introspected command tree.
///
/// Serializes to `{description, flags: [{flag, description}], subcommands: {name: node}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandNode {
    pub description: String,
    pub flags: Vec<Flag>,
    pub subcommands: BTreeMap<String, CommandNode>,
}

impl CommandNode {
    /// Node carrying only the one-line description from its parent's listing.
    ///
    /// Used when the command itself could not be probed or lies past the depth bound.
    pub fn stub(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// Total number of nodes in this subtree, `self` included.
    pub fn command_count(&self) -> usize {
        1 + self.subcommands.values().map(CommandNode::command_count).sum::<usize>()
    }
}

/// Source of raw help text for a command path.
///
/// The production implementation spawns the tool (see [`crate::ExternalProber`]);
/// tests substitute fixed text.
pub trait Prober {
    /// Fetch the help output for `path`.
    ///
    /// A non-zero exit status of the probed tool is not a failure as long as it printed something.
    fn probe(&self, path: &CommandPath) -> Result<String, ProbeFailure>;
}

impl<P: Prober + ?Sized> Prober for &P {
    fn probe(&self, path: &CommandPath) -> Result<String, ProbeFailure> {
        (**self).probe(path)
    }
}

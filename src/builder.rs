use crate::command::{CommandNode, CommandPath, Prober};
use crate::error::BuildError;
use crate::extract::HelpSections;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Walks a tool's help pages depth-first and assembles the command tree.
///
/// The table of processed paths lives inside the builder, so it is scoped to
/// exactly one [`TreeBuilder::build`] call. Paths that yielded nothing are
/// remembered as well: no command path is ever probed twice. A finished node is
/// owned by its parent's subcommand map only, which is where a repeated listing
/// finds it.
///
/// Example
/// ```
/// use help_scraper::{CommandPath, Prober, ProbeFailure, TreeBuilder};
///
/// struct Fixed;
///
/// impl Prober for Fixed {
///     fn probe(&self, path: &CommandPath) -> Result<String, ProbeFailure> {
///         Ok(format!("Help for {path}.\nUsage: {path}\n"))
///     }
/// }
///
/// let root = TreeBuilder::new(&Fixed, 3).build("tool").unwrap();
/// assert_eq!(root.description, "Help for tool.");
/// ```
pub struct TreeBuilder<P> {
    prober: P,
    max_depth: usize,
    processed: HashSet<CommandPath>,
}

impl<P: Prober> TreeBuilder<P> {
    /// Commands deeper than `max_depth` are not probed; the tool itself is depth 0.
    pub fn new(prober: P, max_depth: usize) -> Self {
        Self {
            prober,
            max_depth,
            processed: HashSet::new(),
        }
    }

    /// Build the whole tree below `tool`.
    ///
    /// Fails only when the tool's own help output cannot be obtained; every
    /// failure further down turns into a stub node.
    pub fn build(mut self, tool: &str) -> Result<CommandNode, BuildError> {
        let root = CommandPath::root(tool);
        let text = self
            .prober
            .probe(&root)
            .map_err(|source| BuildError::RootUnavailable {
                tool: tool.to_string(),
                source,
            })?;
        let node = self.assemble(&root, &text);
        debug!(tool, commands = node.command_count(), "command tree complete");
        Ok(node)
    }

    fn explore(&mut self, path: CommandPath) -> Option<CommandNode> {
        if !self.processed.insert(path.clone()) {
            debug!(command = %path, "already processed");
            return None;
        }

        if path.depth() > self.max_depth {
            debug!(command = %path, max_depth = self.max_depth, "depth limit reached");
            None
        } else {
            match self.prober.probe(&path) {
                Ok(text) => Some(self.assemble(&path, &text)),
                Err(failure) => {
                    debug!(command = %failure.path(), "keeping listing description only");
                    None
                }
            }
        }
    }

    fn assemble(&mut self, path: &CommandPath, text: &str) -> CommandNode {
        let HelpSections {
            description,
            flags,
            subcommands: listing,
        } = HelpSections::parse(text);
        if description.is_empty() && flags.is_empty() && listing.is_empty() {
            debug!(command = %path, "nothing recognizable in help output");
        }

        let mut subcommands = BTreeMap::new();
        for entry in listing {
            // The listing is sorted, so the first description of a repeated name wins.
            if subcommands.contains_key(&entry.name) {
                debug!(command = %path.child(&entry.name), "already processed");
                continue;
            }
            let child = match self.explore(path.child(&entry.name)) {
                Some(mut child) => {
                    if child.description.is_empty() {
                        child.description = entry.description;
                    }
                    child
                }
                None => CommandNode::stub(entry.description),
            };
            subcommands.insert(entry.name, child);
        }

        CommandNode {
            description,
            flags,
            subcommands,
        }
    }
}

/// Build the command tree of `tool` with a fresh memoization table.
pub fn build<P: Prober>(prober: P, tool: &str, max_depth: usize) -> Result<CommandNode, BuildError> {
    TreeBuilder::new(prober, max_depth).build(tool)
}

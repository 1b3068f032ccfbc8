//! JSON snapshots of a command tree and comparison of two snapshots.
//!
//! A snapshot lets a tree be rendered again without probing the tool, and
//! two snapshots taken from different versions of a tool can be diffed to
//! see how its command surface changed.

use crate::command::{CommandNode, Flag};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;

/// Serialize `root` as pretty-printed JSON.
pub fn to_json(root: &CommandNode) -> Result<String> {
    serde_json::to_string_pretty(root).context("can't serialize command tree")
}

pub fn from_json(text: &str) -> Result<CommandNode> {
    serde_json::from_str(text).context("malformed command tree snapshot")
}

/// Write the snapshot of `root` to `path`, creating missing parent directories.
pub fn save(root: &CommandNode, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("can't create directory {}", parent.display()))?;
    }
    fs::write(path, to_json(root)?).with_context(|| format!("can't write {}", path.display()))
}

pub fn load(path: &Path) -> Result<CommandNode> {
    let text = fs::read_to_string(path).with_context(|| format!("can't read {}", path.display()))?;
    from_json(&text).with_context(|| format!("in {}", path.display()))
}

/// One way in which the newer tree differs from the older one.
///
/// `path` holds the subcommand tokens below the tool; the tool itself is the empty path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    CommandAdded { path: Vec<String> },
    CommandRemoved { path: Vec<String> },
    DescriptionChanged { path: Vec<String>, old: String, new: String },
    FlagAdded { path: Vec<String>, flag: Flag },
    FlagRemoved { path: Vec<String>, flag: Flag },
    FlagChanged { path: Vec<String>, old: Flag, new: Flag },
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |path: &[String]| {
            if path.is_empty() {
                "(root)".to_string()
            } else {
                path.join(" ")
            }
        };
        match self {
            Change::CommandAdded { path } => write!(f, "+ {}", show(path)),
            Change::CommandRemoved { path } => write!(f, "- {}", show(path)),
            Change::DescriptionChanged { path, old, new } => {
                write!(f, "~ {}: description {:?} -> {:?}", show(path), old, new)
            }
            Change::FlagAdded { path, flag } => write!(f, "+ {} {}", show(path), flag.names),
            Change::FlagRemoved { path, flag } => write!(f, "- {} {}", show(path), flag.names),
            Change::FlagChanged { path, old, new } => write!(
                f,
                "~ {} {}: {:?} -> {:?}",
                show(path),
                new.names,
                old.description,
                new.description
            ),
        }
    }
}

/// Every change between `old` and `new`, in depth-first path order.
///
/// Flags are matched by their names; the first occurrence wins when a page
/// repeats a flag. Added or removed commands are reported once, not per
/// descendant.
pub fn diff(old: &CommandNode, new: &CommandNode) -> Vec<Change> {
    let mut changes = Vec::new();
    diff_node(old, new, &mut Vec::new(), &mut changes);
    changes
}

fn diff_node(old: &CommandNode, new: &CommandNode, path: &mut Vec<String>, changes: &mut Vec<Change>) {
    if old.description != new.description {
        changes.push(Change::DescriptionChanged {
            path: path.clone(),
            old: old.description.clone(),
            new: new.description.clone(),
        });
    }

    let old_flags = by_names(&old.flags);
    let new_flags = by_names(&new.flags);
    for (names, flag) in &old_flags {
        match new_flags.get(names) {
            None => changes.push(Change::FlagRemoved {
                path: path.clone(),
                flag: (*flag).clone(),
            }),
            Some(other) if other.description != flag.description => changes.push(Change::FlagChanged {
                path: path.clone(),
                old: (*flag).clone(),
                new: (*other).clone(),
            }),
            Some(_) => {}
        }
    }
    for (names, flag) in &new_flags {
        if !old_flags.contains_key(names) {
            changes.push(Change::FlagAdded {
                path: path.clone(),
                flag: (*flag).clone(),
            });
        }
    }

    let names: BTreeSet<&String> =
        old.subcommands.keys().chain(new.subcommands.keys()).collect();
    for name in names {
        path.push(name.clone());
        match (old.subcommands.get(name), new.subcommands.get(name)) {
            (Some(a), Some(b)) => diff_node(a, b, path, changes),
            (Some(_), None) => changes.push(Change::CommandRemoved { path: path.clone() }),
            (None, Some(_)) => changes.push(Change::CommandAdded { path: path.clone() }),
            (None, None) => {}
        }
        path.pop();
    }
}

fn by_names(flags: &[Flag]) -> BTreeMap<&str, &Flag> {
    let mut map = BTreeMap::new();
    for flag in flags {
        map.entry(flag.names.as_str()).or_insert(flag);
    }
    map
}

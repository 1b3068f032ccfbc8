//! Document a command-line tool you don't control by reading its `--help` output.
//!
//! The tool is probed recursively: the help page of the tool itself lists its
//! subcommands, each of their pages lists theirs, and so on. Every page is
//! reduced to a description, a list of flags and a list of subcommands, and the
//! resulting [`CommandNode`] tree can be rendered as Markdown ([`MarkdownRenderer`])
//! or stored as a JSON [`snapshot`].
//!
//! The probing itself sits behind the [`Prober`] trait. [`ExternalProber`] runs the
//! real tool with a timeout; tests plug in canned text instead.

mod builder;
pub mod command;
pub mod config;
pub mod env;
pub mod error;
mod external;
pub mod extract;
mod render;
pub mod snapshot;

pub use builder::{TreeBuilder, build};
pub use command::{CommandNode, CommandPath, Flag, Prober};
pub use config::ScrapeConfig;
pub use error::{BuildError, ProbeFailure};
pub use external::{ExternalProber, find_command_path};
pub use render::{MarkdownRenderer, anchor_id, split_flag_type};

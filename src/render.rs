//! Markdown reference document for a command tree.

use crate::command::{CommandNode, Flag};
use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;

/// Deepest heading level Markdown supports.
const MAX_HEADING_LEVEL: usize = 6;

/// Leading words of a flag description that name the flag's value type.
const KNOWN_TYPES: &[&str] = &[
    "string", "bool", "int", "uint", "float", "duration", "strings", "uint16", "uint32", "uint64",
    "int16", "int32", "int64", "float32", "float64",
];

static NON_ANCHOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\-]").expect("anchor rule"));

/// Anchor id of a command, e.g. `avalanche-blockchain-create`.
pub fn anchor_id(tool: &str, chain: &[String]) -> String {
    let joined = std::iter::once(tool)
        .chain(chain.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();
    NON_ANCHOR.replace_all(&joined, "").into_owned()
}

/// Split a recognized value type off the front of a flag description.
///
/// Returns `(type, rest)`; the type is empty when the first word is not a known type
/// or is the only word.
pub fn split_flag_type(description: &str) -> (&str, &str) {
    let description = description.trim();
    match description.split_once(char::is_whitespace) {
        Some((first, rest)) if KNOWN_TYPES.contains(&first.to_lowercase().as_str()) => {
            (first, rest.trim_start())
        }
        _ => ("", description),
    }
}

/// Writes the command tree as one Markdown page, one section per command.
pub struct MarkdownRenderer {
    tool: String,
}

impl MarkdownRenderer {
    pub fn new(tool: impl Into<String>) -> Self {
        Self { tool: tool.into() }
    }

    /// Render the document into a string.
    pub fn render(&self, root: &CommandNode) -> String {
        let mut out = Vec::new();
        // Writing into a Vec never fails.
        let _ = self.write(root, &mut out);
        String::from_utf8_lossy(&out).into_owned()
    }

    /// Render the document to `path`, creating missing parent directories.
    pub fn write_to_file(&self, root: &CommandNode, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("can't create directory {}", parent.display()))?;
        }
        let mut file = fs::File::create(path)
            .with_context(|| format!("can't create {}", path.display()))?;
        self.write(root, &mut file)
            .with_context(|| format!("can't write {}", path.display()))
    }

    /// Stream the document to `out`.
    ///
    /// The root itself gets no section; only its subcommands do.
    pub fn write(&self, root: &CommandNode, out: &mut dyn Write) -> std::io::Result<()> {
        self.write_section(root, &mut Vec::new(), out)
    }

    fn write_section(
        &self,
        node: &CommandNode,
        chain: &mut Vec<String>,
        out: &mut dyn Write,
    ) -> std::io::Result<()> {
        if !chain.is_empty() {
            self.write_heading(node, chain, out)?;
            self.write_flags(&node.flags, out)?;
        }

        for (name, child) in &node.subcommands {
            chain.push(name.clone());
            self.write_section(child, chain, out)?;
            chain.pop();
        }
        Ok(())
    }

    fn write_heading(
        &self,
        node: &CommandNode,
        chain: &[String],
        out: &mut dyn Write,
    ) -> std::io::Result<()> {
        let level = (chain.len() + 1).min(MAX_HEADING_LEVEL);
        let title = if chain.len() == 1 {
            format!("{} {}", self.tool, chain[0])
        } else {
            chain[1..].join(" ")
        };

        writeln!(out, "<a id=\"{}\"></a>", anchor_id(&self.tool, chain))?;
        writeln!(out, "{} {}\n", "#".repeat(level), title)?;

        if !node.description.is_empty() {
            writeln!(out, "{}\n", node.description)?;
        }

        writeln!(out, "**Usage:**")?;
        writeln!(
            out,
            "```bash\n{} {} [subcommand] [flags]\n```\n",
            self.tool,
            chain.join(" ")
        )?;

        if !node.subcommands.is_empty() {
            writeln!(out, "**Subcommands:**\n")?;
            let mut sub_chain = chain.to_vec();
            for (name, child) in &node.subcommands {
                sub_chain.push(name.clone());
                writeln!(
                    out,
                    "- [`{}`](#{}): {}",
                    name,
                    anchor_id(&self.tool, &sub_chain),
                    child.description
                )?;
                sub_chain.pop();
            }
            writeln!(out)?;
        }
        Ok(())
    }

    fn write_flags(&self, flags: &[Flag], out: &mut dyn Write) -> std::io::Result<()> {
        if flags.is_empty() {
            return Ok(());
        }

        let rows: Vec<(String, &str)> = flags
            .iter()
            .map(|flag| match split_flag_type(&flag.description) {
                ("", description) => (flag.names.clone(), description),
                (kind, description) => (format!("{} {}", flag.names, kind), description),
            })
            .collect();
        let width = rows.iter().map(|(names, _)| names.chars().count()).max().unwrap_or(0);

        writeln!(out, "**Flags:**\n")?;
        writeln!(out, "```bash")?;
        for (names, description) in &rows {
            writeln!(out, "{:<width$}    {}", names, description)?;
        }
        writeln!(out, "```\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    fn sample_tree() -> CommandNode {
        let mut create = CommandNode::stub("Create a new blockchain configuration");
        create.flags = vec![
            Flag::new("-f, --force", "overwrite the existing configuration"),
            Flag::new("--genesis", "string file path of genesis to use"),
            Flag::new("-h, --help", "help"),
        ];
        let mut blockchain = CommandNode::stub("Manage blockchains");
        blockchain.subcommands.insert("deploy".into(), CommandNode::stub("Deploy it"));
        blockchain.subcommands.insert("create".into(), create);

        let mut root = CommandNode::stub("The root tool");
        root.flags.push(Flag::new("--root-only", "never rendered"));
        root.subcommands.insert("blockchain".into(), blockchain);
        root
    }

    #[test]
    fn test_anchor_id() {
        assert_eq!(
            anchor_id("avalanche", &chain(&["blockchain", "create"])),
            "avalanche-blockchain-create"
        );
        assert_eq!(anchor_id("Tool", &chain(&["Add.Validator", "x/y"])), "tool-addvalidator-xy");
        assert_ne!(
            anchor_id("tool", &chain(&["a", "b"])),
            anchor_id("tool", &chain(&["a", "c"]))
        );
    }

    #[test]
    fn test_split_flag_type() {
        assert_eq!(split_flag_type("string file path"), ("string", "file path"));
        assert_eq!(split_flag_type("Duration   wait this long"), ("Duration", "wait this long"));
        assert_eq!(split_flag_type("overwrite the file"), ("", "overwrite the file"));
        assert_eq!(split_flag_type("bool"), ("", "bool"));
    }

    #[test]
    fn test_full_document() {
        let doc = MarkdownRenderer::new("avalanche").render(&sample_tree());
        let expected = "\
<a id=\"avalanche-blockchain\"></a>
## avalanche blockchain

Manage blockchains

**Usage:**
```bash
avalanche blockchain [subcommand] [flags]
```

**Subcommands:**

- [`create`](#avalanche-blockchain-create): Create a new blockchain configuration
- [`deploy`](#avalanche-blockchain-deploy): Deploy it

<a id=\"avalanche-blockchain-create\"></a>
### create

Create a new blockchain configuration

**Usage:**
```bash
avalanche blockchain create [subcommand] [flags]
```

**Flags:**

```bash
-f, --force         overwrite the existing configuration
--genesis string    file path of genesis to use
-h, --help          help
```

<a id=\"avalanche-blockchain-deploy\"></a>
### deploy

Deploy it

**Usage:**
```bash
avalanche blockchain deploy [subcommand] [flags]
```

";
        assert_eq!(doc, expected);
    }

    #[test]
    fn test_root_alone_renders_nothing() {
        let doc = MarkdownRenderer::new("tool").render(&CommandNode::stub("desc"));
        assert!(doc.is_empty());
    }

    #[test]
    fn test_heading_level_is_capped() {
        let mut node = CommandNode::default();
        for name in ["g", "f", "e", "d", "c", "b", "a"] {
            let mut parent = CommandNode::default();
            parent.subcommands.insert(name.to_string(), node);
            node = parent;
        }
        let doc = MarkdownRenderer::new("tool").render(&node);

        assert!(doc.contains("\n## tool a\n"));
        assert!(doc.contains("\n###### b c d e f\n"));
        assert!(doc.contains("\n###### b c d e f g\n"));
        assert!(!doc.contains("#######"));
    }

    #[test]
    fn test_empty_description_is_omitted() {
        let mut root = CommandNode::default();
        root.subcommands.insert("bare".into(), CommandNode::default());
        let doc = MarkdownRenderer::new("tool").render(&root);
        assert_eq!(
            doc,
            "<a id=\"tool-bare\"></a>\n## tool bare\n\n**Usage:**\n```bash\ntool bare [subcommand] [flags]\n```\n\n"
        );
    }

    #[test]
    fn test_write_to_file_creates_parent_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cmd").join("commands.md");

        MarkdownRenderer::new("avalanche")
            .write_to_file(&sample_tree(), &path)
            .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("<a id=\"avalanche-blockchain\"></a>\n"));
    }
}

//! Extraction rules turning free-form `--help` text into command data.
//!
//! Every rule is independent and optional: a help page without a usage line,
//! without a `Flags:` block or without a commands block simply yields an empty
//! value for that part.

use crate::command::Flag;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Everything up to the line that opens the usage block.
static DESCRIPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\A\s*(.*?)\n\s*Usage:").expect("description rule"));

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<(.*?)>").expect("placeholder rule"));

// A block runs until a blank line, an unindented line or the end of the text.
static FLAGS_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?sm)^Flags:\n(.*?)(?:\n\n|^\S|\z)").expect("flags block rule"));

static GLOBAL_FLAGS_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?sm)^Global Flags:\n(.*?)(?:\n\n|^\S|\z)").expect("global flags block rule")
});

static COMMANDS_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?sm)(?:^Available Commands?:\n|^Commands?:\n)(.*?)(?:\n\n|^\S|\z)")
        .expect("commands block rule")
});

/// `  -n, --name string   description`
static FLAG_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]+(-{1,2}[^\s,]+(?:,[ \t]*-{1,2}[^\s,]+)*)[ \t]+(.*)$").expect("flag line rule")
});

/// `  create   Create a new thing`
static COMMAND_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]+(\S+)(?:[ \t]+(.*))?$").expect("command line rule"));

/// One row of a commands block.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SubcommandEntry {
    pub name: String,
    pub description: String,
}

/// The parts of one help page the builder cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelpSections {
    pub description: String,
    pub flags: Vec<Flag>,
    /// Unique entries in lexicographic order.
    pub subcommands: Vec<SubcommandEntry>,
}

impl HelpSections {
    pub fn parse(text: &str) -> Self {
        let text = text.replace("\r\n", "\n");
        Self {
            description: extract_description(&text),
            flags: extract_flags(&text),
            subcommands: extract_subcommands(&text),
        }
    }
}

/// Rewrite `<name>` placeholders as `` `name` `` so renderers never treat them as markup.
pub fn inline_placeholders(text: &str) -> String {
    PLACEHOLDER.replace_all(text, "`${1}`").into_owned()
}

/// Text preceding the usage block, or empty when there is no usage block.
pub fn extract_description(text: &str) -> String {
    DESCRIPTION
        .captures(text)
        .map(|caps| inline_placeholders(caps[1].trim()))
        .unwrap_or_default()
}

/// Local flags in source order, followed by global flags in source order.
pub fn extract_flags(text: &str) -> Vec<Flag> {
    [&*FLAGS_BLOCK, &*GLOBAL_FLAGS_BLOCK]
        .into_iter()
        .filter_map(|block| block_body(block, text))
        .flat_map(|body| {
            FLAG_LINE
                .captures_iter(body)
                .map(|caps| Flag::new(caps[1].trim(), one_line(&caps[2])))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Rows of the commands block, deduplicated and sorted by `(name, description)`.
pub fn extract_subcommands(text: &str) -> Vec<SubcommandEntry> {
    let Some(body) = block_body(&COMMANDS_BLOCK, text) else {
        return Vec::new();
    };
    COMMAND_LINE
        .captures_iter(body)
        .map(|caps| SubcommandEntry {
            name: caps[1].to_string(),
            description: caps.get(2).map(|m| one_line(m.as_str())).unwrap_or_default(),
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn block_body<'t>(block: &Regex, text: &'t str) -> Option<&'t str> {
    block.captures(text).and_then(|caps| caps.get(1)).map(|m| m.as_str())
}

/// Single-spaced description with placeholders inlined.
fn one_line(raw: &str) -> String {
    inline_placeholders(&raw.split_whitespace().collect::<Vec<_>>().join(" "))
}

//! zpool Extractor
//!
//! Splits `zpool status` into one block per pool and walks each pool's
//! configuration tree, labelling every leaf device with the vdev group
//! it sits under.

use super::record::Record;
use regex::Regex;
use std::sync::OnceLock;
use tracing::trace;

/// Verb producing the pool status dump
pub const STATUS_VERB: &str = "status";

/// Group assigned to leaves that appear before any group header
pub const STRIPE_GROUP: &str = "stripe";

/// Name prefixes that open a vdev group
const GROUP_PREFIXES: [&str; 5] = ["mirror", "log", "raid", "spare", "cache"];

/// Column header of the configuration tree
const TREE_HEADER: &str = "NAME";

pub fn status_args() -> Vec<String> {
    vec![STATUS_VERB.to_string()]
}

fn config_section() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)\n\s*config:[^\n]*\n(?P<config>.*?)(?:\n\s*errors:|\z)")
            .expect("config section grammar")
    })
}

fn tree_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[ \t]+(?P<name>\S+)").expect("tree line grammar"))
}

/// A pool's name and the raw text of its configuration tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolBlock<'a> {
    pub name: &'a str,
    pub config: &'a str,
}

/// Split the status dump into one block per pool
pub fn split_pools(text: &str) -> Vec<PoolBlock<'_>> {
    text.split("pool:")
        .skip(1)
        .filter_map(|chunk| {
            let name = chunk.split_whitespace().next()?;
            let Some(caps) = config_section().captures(chunk) else {
                trace!(pool = name, "pool block without config section");
                return None;
            };
            let config = caps.name("config").map_or("", |m| m.as_str());
            Some(PoolBlock { name, config })
        })
        .collect()
}

fn is_group_header(name: &str) -> bool {
    GROUP_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

/// Tree state carried from line to line
#[derive(Debug, Clone)]
struct TreeFold {
    current_group: String,
    leaves: Vec<Record>,
}

/// Label each leaf of one pool's configuration tree with its parent group.
///
/// Records carry `pool`, `group` and `device` (the name as printed).
pub fn extract_pool_members(block: &PoolBlock<'_>) -> Vec<Record> {
    let init = TreeFold {
        current_group: STRIPE_GROUP.to_string(),
        leaves: Vec::new(),
    };

    let fold = block.config.lines().fold(init, |mut acc, line| {
        let Some(caps) = tree_line().captures(line) else {
            return acc;
        };
        let name = &caps["name"];

        if name == TREE_HEADER || name == block.name {
            return acc;
        }
        if is_group_header(name) {
            acc.current_group = name.to_string();
            return acc;
        }

        acc.leaves.push(
            Record::new()
                .with("pool", block.name)
                .with("group", &acc.current_group)
                .with("device", name),
        );
        acc
    });

    fold.leaves
}

/// Pool membership records for every pool in the status dump
pub fn extract_pools(text: &str) -> Vec<Record> {
    split_pools(text)
        .iter()
        .flat_map(extract_pool_members)
        .collect()
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Session blocks, run in a fixed order: working memory, rest, relational.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    WorkingMemory,
    Rest,
    Relational,
}

impl BlockKind {
    pub const fn first() -> Self {
        BlockKind::WorkingMemory
    }

    pub fn next(&self) -> Option<Self> {
        use BlockKind::*;
        Some(match self {
            WorkingMemory => Rest,
            Rest => Relational,
            Relational => return None,
        })
    }

    /// Blocks that produce data rows.
    pub fn has_trials(&self) -> bool {
        !matches!(self, BlockKind::Rest)
    }

    /// Value of the `block` column for rows of this block.
    pub fn record_tag(&self) -> Option<&'static str> {
        match self {
            BlockKind::WorkingMemory => Some("wm"),
            BlockKind::Relational => Some("main"),
            BlockKind::Rest => None,
        }
    }

    pub fn from_record_tag(tag: &str) -> Option<Self> {
        match tag {
            "wm" => Some(BlockKind::WorkingMemory),
            "main" => Some(BlockKind::Relational),
            _ => None,
        }
    }

    pub fn sequence() -> impl Iterator<Item = BlockKind> {
        std::iter::successors(Some(Self::first()), BlockKind::next)
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlockKind::WorkingMemory => "working-memory",
            BlockKind::Rest => "rest",
            BlockKind::Relational => "relational",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_run_wm_rest_main() {
        let order: Vec<_> = BlockKind::sequence().collect();
        assert_eq!(
            order,
            vec![
                BlockKind::WorkingMemory,
                BlockKind::Rest,
                BlockKind::Relational
            ]
        );
    }

    #[test]
    fn record_tags_round_trip() {
        for block in BlockKind::sequence().filter(BlockKind::has_trials) {
            let tag = block.record_tag().unwrap();
            assert_eq!(BlockKind::from_record_tag(tag), Some(block));
        }
        assert_eq!(BlockKind::Rest.record_tag(), None);
    }
}

//! # Chain Topology
//!
//! A block's view of its replica chain: the ordered replica list, its own
//! position, and the successor writes are forwarded to.
//!
//! ```text
//! client ──→ [head] ──→ [middle] ──→ [tail]
//!               ↑           ↑           │
//!               └─── ack ───┴─── ack ───┘
//! ```
//!
//! The topology has no identity of its own; it lives inside the block.

use serde::{Deserialize, Serialize};
use shared_types::{BlockName, ChainRole};

use super::errors::BlockError;

/// Ordered replica list and this block's place in it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTopology {
    chain: Vec<BlockName>,
    position: usize,
    role: ChainRole,
    next: Option<BlockName>,
}

impl ChainTopology {
    /// Build and validate a topology for `block`.
    ///
    /// An empty `next_block_name` means "no successor". The chain must list
    /// `block`, the declared role must match its position, and the successor
    /// must be the next chain entry.
    pub fn new(
        block: &str,
        chain: &[BlockName],
        role: ChainRole,
        next_block_name: &str,
    ) -> Result<Self, BlockError> {
        if chain.is_empty() {
            return Err(BlockError::chain(block, "empty replica chain"));
        }

        let position = chain
            .iter()
            .position(|name| name == block)
            .ok_or_else(|| BlockError::chain(block, "block is not a member of its chain"))?;

        let expected = ChainRole::for_position(position, chain.len());
        if expected != role {
            return Err(BlockError::chain(
                block,
                format!("role {} does not match chain position {} ({})", role, position, expected),
            ));
        }

        let next = if next_block_name.is_empty() {
            None
        } else {
            Some(next_block_name.to_string())
        };

        match (&next, role.has_successor()) {
            (None, true) => {
                return Err(BlockError::chain(block, format!("{} requires a successor", role)));
            }
            (Some(name), false) => {
                return Err(BlockError::chain(
                    block,
                    format!("{} cannot forward to {}", role, name),
                ));
            }
            (Some(name), true) if chain.get(position + 1) != Some(name) => {
                return Err(BlockError::chain(
                    block,
                    format!("successor {} is not the next chain member", name),
                ));
            }
            _ => {}
        }

        Ok(Self {
            chain: chain.to_vec(),
            position,
            role,
            next,
        })
    }

    /// The full replica list, head first.
    pub fn chain(&self) -> &[BlockName] {
        &self.chain
    }

    /// This block's role.
    pub fn role(&self) -> ChainRole {
        self.role
    }

    /// Successor writes are forwarded to.
    pub fn next(&self) -> Option<&BlockName> {
        self.next.as_ref()
    }

    /// Predecessor acknowledgements are sent to.
    pub fn predecessor(&self) -> Option<&BlockName> {
        self.position.checked_sub(1).and_then(|i| self.chain.get(i))
    }

    /// Chain head.
    pub fn head(&self) -> &BlockName {
        &self.chain[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain3() -> Vec<BlockName> {
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    }

    #[test]
    fn test_singleton_chain() {
        let topo = ChainTopology::new("a", &["a".to_string()], ChainRole::Singleton, "").unwrap();
        assert_eq!(topo.role(), ChainRole::Singleton);
        assert!(topo.next().is_none());
        assert!(topo.predecessor().is_none());
    }

    #[test]
    fn test_middle_links() {
        let topo = ChainTopology::new("b", &chain3(), ChainRole::Middle, "c").unwrap();
        assert_eq!(topo.next().map(String::as_str), Some("c"));
        assert_eq!(topo.predecessor().map(String::as_str), Some("a"));
        assert_eq!(topo.head(), "a");
    }

    #[test]
    fn test_tail_rejects_successor() {
        let err = ChainTopology::new("c", &chain3(), ChainRole::Tail, "a").unwrap_err();
        assert!(matches!(err, BlockError::InvalidChain { .. }));
    }

    #[test]
    fn test_head_requires_successor() {
        assert!(ChainTopology::new("a", &chain3(), ChainRole::Head, "").is_err());
    }

    #[test]
    fn test_role_must_match_position() {
        assert!(ChainTopology::new("a", &chain3(), ChainRole::Tail, "").is_err());
    }

    #[test]
    fn test_successor_must_be_next_member() {
        assert!(ChainTopology::new("a", &chain3(), ChainRole::Head, "c").is_err());
    }

    #[test]
    fn test_block_must_be_member() {
        assert!(ChainTopology::new("z", &chain3(), ChainRole::Head, "b").is_err());
        assert!(ChainTopology::new("a", &[], ChainRole::Singleton, "").is_err());
    }
}

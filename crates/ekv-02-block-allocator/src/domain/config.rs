use serde::{Deserialize, Serialize};
use shared_types::BlockName;

/// Allocator configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// Blocks placed in the free pool at startup, in allocation order.
    pub initial_blocks: Vec<BlockName>,
    /// Refuse `free` for blocks the reset probe reports as still allocated.
    pub strict_reset_check: bool,
}

impl AllocatorConfig {
    /// Pool seeded with `names`, reset check on.
    pub fn with_blocks<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<BlockName>,
    {
        Self {
            initial_blocks: names.into_iter().map(Into::into).collect(),
            strict_reset_check: true,
        }
    }
}

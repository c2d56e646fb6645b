//! Cluster-wide ownership invariants, checked over block status snapshots.

use shared_types::{BlockName, Slot, SlotSet};

/// Two blocks claiming the same slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoubleOwnership {
    pub slot: Slot,
    pub first: BlockName,
    pub second: BlockName,
}

/// INVARIANT: No double ownership
/// A slot belongs to at most one block's REGULAR ownership.
pub fn invariant_no_double_ownership(owners: &[(BlockName, SlotSet)]) -> Result<(), DoubleOwnership> {
    let mut claims: Vec<(u32, u32, &BlockName)> = owners
        .iter()
        .flat_map(|(name, set)| set.ranges().iter().map(move |r| (r.begin(), r.end(), name)))
        .collect();
    claims.sort();

    for pair in claims.windows(2) {
        let (_, prev_end, prev_name) = pair[0];
        let (begin, _, name) = pair[1];
        if begin < prev_end {
            return Err(DoubleOwnership {
                slot: begin,
                first: prev_name.clone(),
                second: name.clone(),
            });
        }
    }
    Ok(())
}

/// INVARIANT: Full coverage
/// Every slot of the keyspace is owned by some block.
pub fn invariant_full_coverage(owners: &[(BlockName, SlotSet)]) -> bool {
    let mut ranges: Vec<_> = owners
        .iter()
        .flat_map(|(_, set)| set.ranges().iter().copied())
        .collect();
    ranges.sort();

    let mut covered: Slot = 0;
    for range in ranges {
        if range.begin() > covered {
            return false;
        }
        covered = covered.max(range.end());
    }
    covered == shared_types::SLOT_MAX
}

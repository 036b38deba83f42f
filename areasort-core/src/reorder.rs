use serde::Serialize;
use std::ops::Range;
use tracing::debug;

use crate::area::{AreaResource, Item};
use crate::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReorderSummary {
    pub containers_sorted: usize,
    pub containers_skipped: usize,
    /// Slots whose record now comes from a different slot.
    pub slots_moved: usize,
}

/// Source slot for each destination slot of `slots`, ordered by resource
/// reference. The sort is stable, so equal references keep their order.
fn sorted_slot_order(items: &[Item], slots: Range<usize>) -> Vec<usize> {
    let mut indexed: Vec<(&str, usize)> = slots
        .map(|slot| (items[slot].resource_reference.as_str(), slot))
        .collect();
    indexed.sort_by(|a, b| a.0.cmp(b.0));
    indexed.into_iter().map(|(_, slot)| slot).collect()
}

fn ranges_disjoint(ranges: &[Range<usize>]) -> bool {
    let mut sorted: Vec<_> = ranges.iter().filter(|r| !r.is_empty()).collect();
    sorted.sort_by_key(|r| r.start);
    sorted.windows(2).all(|pair| pair[0].end <= pair[1].start)
}

/// Sorts the item slice of every container by resource reference.
///
/// Whole item records are moved, not just their reference field. Every copy
/// reads from a snapshot of the buffer taken before the first write, and the
/// record views are rebuilt once all containers are done. Container ranges are
/// checked against the item array before anything is written, so a bad range
/// leaves the area untouched.
pub fn sort_container_items(area: &mut AreaResource) -> Result<ReorderSummary> {
    let ranges = (0..area.containers().len())
        .map(|index| area.container_slots(index))
        .collect::<Result<Vec<_>>>()?;
    debug_assert!(ranges_disjoint(&ranges), "container item ranges overlap");

    let mut summary = ReorderSummary::default();
    let mut plans = Vec::new();
    for (index, slots) in ranges.into_iter().enumerate() {
        if slots.is_empty() {
            summary.containers_skipped += 1;
            continue;
        }
        let order = sorted_slot_order(area.items(), slots.clone());
        debug!(
            container = index,
            first = slots.start,
            count = slots.len(),
            "sorting container items"
        );
        plans.push((slots.start, order));
        summary.containers_sorted += 1;
    }

    let items = area.layout().items;
    let snapshot = area.as_bytes().to_vec();
    let buffer = area.buffer_mut();
    for (first, order) in &plans {
        for (j, &source) in order.iter().enumerate() {
            let dest = first + j;
            if source != dest {
                summary.slots_moved += 1;
            }
            buffer[items.record_range(dest)].copy_from_slice(&snapshot[items.record_range(source)]);
        }
    }

    area.rebuild_views()?;
    Ok(summary)
}

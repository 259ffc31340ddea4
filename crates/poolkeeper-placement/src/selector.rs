//! Slot selection primitives for cluster allocation.
//!
//! - **Lowest-load selection**: the `k` least-loaded slots, found with a
//!   bounded max-heap instead of sorting the whole registry
//! - **Projected load factor**: the worst `load / maxload` a candidate set
//!   would reach if the allocation were charged to it

use std::collections::{BinaryHeap, HashMap, HashSet};

use poolkeeper_state::{SlotId, SlotTable, ratio};

/// Select up to `k` slots with the smallest load, skipping `exclude`.
///
/// Ties are broken by registry order (lower id first). The result is in
/// ascending `(load, registry position)` order, which is also the order in
/// which executors receive their content indices.
pub fn lowest_load(table: &SlotTable, k: usize, exclude: &HashSet<SlotId>) -> Vec<SlotId> {
    if k == 0 {
        return Vec::new();
    }

    // Max-heap keyed on (load, position): the top is the worst slot kept so far.
    let mut heap: BinaryHeap<(u32, usize, SlotId)> = BinaryHeap::with_capacity(k + 1);
    for (position, (&id, slot)) in table.iter().enumerate() {
        if exclude.contains(&id) {
            continue;
        }
        if heap.len() < k {
            heap.push((slot.load, position, id));
            continue;
        }
        let Some(&(worst_load, worst_pos, _)) = heap.peek() else {
            continue;
        };
        if (slot.load, position) < (worst_load, worst_pos) {
            heap.pop();
            heap.push((slot.load, position, id));
        }
    }

    heap.into_sorted_vec()
        .into_iter()
        .map(|(_, _, id)| id)
        .collect()
}

/// Highest `load / maxload` across `ids`.
///
/// With `charge` set, each occurrence of an id adds one to that slot's load
/// first, so a slot named twice is counted as carrying both executors.
/// Unknown ids are ignored.
pub fn projected_load_factor(table: &SlotTable, ids: &[SlotId], charge: bool) -> f64 {
    let mut charged: HashMap<SlotId, u32> = HashMap::new();
    let mut worst = 0.0_f64;

    for &id in ids {
        let Some(slot) = table.get(&id) else { continue };
        let extra = if charge {
            let n = charged.entry(id).or_insert(0);
            *n += 1;
            *n
        } else {
            0
        };
        let factor = ratio(slot.load.saturating_add(extra), slot.maxload);
        if factor > worst {
            worst = factor;
        }
    }

    worst
}

/// Whether the fallback selection should replace the named one.
///
/// Named slots win unless at least one is over capacity and the named load
/// factor exceeds the fallback's by more than `fallback_ratio`.
pub fn prefer_fallback(named: f64, fallback: f64, fallback_ratio: f64) -> bool {
    named > 1.0 && named > fallback_ratio * fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use poolkeeper_state::Slot;

    fn slot(load: u32, maxload: u32) -> Slot {
        Slot {
            hostname: "gpadmin".to_string(),
            port: 7000,
            datadir: format!("/data/dbfast-{load}-{maxload}"),
            maxload,
            load,
        }
    }

    /// Full sort by (load, registry position).
    fn rank_by_load(table: &SlotTable) -> Vec<SlotId> {
        let mut ranked: Vec<(u32, usize, SlotId)> = table
            .iter()
            .enumerate()
            .map(|(pos, (&id, slot))| (slot.load, pos, id))
            .collect();
        ranked.sort();
        ranked.into_iter().map(|(_, _, id)| id).collect()
    }

    fn table(loads: &[(SlotId, u32, u32)]) -> SlotTable {
        loads
            .iter()
            .map(|&(id, load, max)| (id, slot(load, max)))
            .collect()
    }

    #[test]
    fn picks_smallest_loads_in_ascending_order() {
        let t = table(&[(1, 5, 10), (2, 1, 10), (3, 8, 10)]);
        assert_eq!(lowest_load(&t, 2, &HashSet::new()), vec![2, 1]);
    }

    #[test]
    fn ties_resolve_by_registry_order() {
        let t = table(&[(4, 3, 10), (7, 1, 10), (9, 3, 10), (12, 3, 10)]);
        assert_eq!(lowest_load(&t, 3, &HashSet::new()), vec![7, 4, 9]);
    }

    #[test]
    fn zero_k_selects_nothing() {
        let t = table(&[(1, 0, 10)]);
        assert!(lowest_load(&t, 0, &HashSet::new()).is_empty());
    }

    #[test]
    fn k_larger_than_registry_returns_everything() {
        let t = table(&[(1, 2, 10), (2, 0, 10)]);
        assert_eq!(lowest_load(&t, 5, &HashSet::new()), vec![2, 1]);
    }

    #[test]
    fn excluded_slots_are_skipped() {
        let t = table(&[(1, 0, 10), (2, 1, 10), (3, 2, 10)]);
        let exclude: HashSet<_> = [1].into_iter().collect();
        assert_eq!(lowest_load(&t, 2, &exclude), vec![2, 3]);
    }

    #[test]
    fn heap_selection_matches_full_ranking() {
        // Deterministic pseudo-random registries, checked against a full sort.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };

        for round in 0..50 {
            let n = 1 + (next() % 40) as u32;
            let t: SlotTable = (1..=n)
                .map(|id| (id, slot((next() % 6) as u32, 10)))
                .collect();
            let k = (next() % (u64::from(n) + 2)) as usize;

            let picked = lowest_load(&t, k, &HashSet::new());
            let expected: Vec<_> = rank_by_load(&t).into_iter().take(k).collect();
            assert_eq!(picked, expected, "round {round}, n={n}, k={k}");

            // No unselected slot is strictly lighter than a selected one.
            let max_picked = picked.iter().map(|id| t[id].load).max();
            if let Some(max_picked) = max_picked {
                for (id, s) in &t {
                    if !picked.contains(id) {
                        assert!(s.load >= max_picked);
                    }
                }
            }
        }
    }

    #[test]
    fn projected_factor_counts_the_new_executor() {
        let t = table(&[(1, 5, 10), (2, 1, 10)]);
        let f = projected_load_factor(&t, &[2, 1], true);
        assert!((f - 0.6).abs() < 1e-9);

        let f = projected_load_factor(&t, &[2, 1], false);
        assert!((f - 0.5).abs() < 1e-9);
    }

    #[test]
    fn repeated_ids_are_charged_per_occurrence() {
        let t = table(&[(1, 8, 10)]);
        let f = projected_load_factor(&t, &[1, 1, 1], true);
        assert!((f - 1.1).abs() < 1e-9);
    }

    #[test]
    fn fallback_threshold_is_strict() {
        assert!(!prefer_fallback(1.0, 0.1, 1.8)); // not over capacity
        assert!(!prefer_fallback(1.8, 1.0, 1.8)); // exactly 1.8x
        assert!(prefer_fallback(1.81, 1.0, 1.8));
        assert!(prefer_fallback(1.1, 0.0, 1.8));
        assert!(!prefer_fallback(1.1, 0.7, 1.8));
    }
}

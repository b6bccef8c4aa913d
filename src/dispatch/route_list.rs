//! RouteList (spec.md §4.1): a doubly-linked sequence of visit-steps with O(1)
//! splice, expressed without raw pointers or `Rc<RefCell<_>>` cycles.
//!
//! Neighborhood operators in `local_search` move Steps between *different*
//! vehicles' routes, so Steps cannot be owned by a per-route `Vec`: a [`StepArena`]
//! owns every Step for the whole [`crate::dispatch::plan::Plan`], and a [`Route`]
//! is just the pair of sentinel handles bounding one vehicle's slice of it. This
//! is the handle-based arena spec.md §9's design notes call for in place of the
//! reference implementation's `pred`/`succ`/`partner` object pointers.

use crate::model::ItemId;

/// Stable handle into a [`StepArena`]. Never reused within a round: Steps are
/// created by Bootstrap or the ConstructiveInserter and live until the round
/// ends (spec.md §3 Lifecycle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StepHandle(u32);

const NONE: StepHandle = StepHandle(u32::MAX);

impl StepHandle {
    fn is_none(self) -> bool {
        self.0 == u32::MAX
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Begin,
    End,
    Pickup,
    Delivery,
}

impl StepKind {
    pub fn is_pickup(self) -> bool {
        matches!(self, StepKind::Pickup)
    }

    pub fn is_delivery(self) -> bool {
        matches!(self, StepKind::Delivery)
    }
}

#[derive(Debug, Clone)]
struct StepSlot {
    kind: StepKind,
    /// Factory index; meaningless for sentinels.
    factory: usize,
    /// Ordered item list; all items share one order_id per spec.md §3.
    items: Vec<ItemId>,
    partner: StepHandle,
    pinned: bool,
    pred: StepHandle,
    succ: StepHandle,
}

/// Owns every Step for every vehicle route in one [`crate::dispatch::plan::Plan`].
#[derive(Debug, Clone, Default)]
pub struct StepArena {
    slots: Vec<StepSlot>,
}

impl StepArena {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    fn slot(&self, h: StepHandle) -> &StepSlot {
        &self.slots[h.0 as usize]
    }

    fn slot_mut(&mut self, h: StepHandle) -> &mut StepSlot {
        &mut self.slots[h.0 as usize]
    }

    /// Allocates a fresh, detached (no pred/succ) sentinel step and returns its handle.
    fn alloc_sentinel(&mut self, kind: StepKind) -> StepHandle {
        let handle = StepHandle(self.slots.len() as u32);
        self.slots.push(StepSlot {
            kind,
            factory: usize::MAX,
            items: Vec::new(),
            partner: NONE,
            pinned: true,
            pred: NONE,
            succ: NONE,
        });
        handle
    }

    /// Allocates a fresh, detached PICKUP or DELIVERY step.
    pub fn alloc(&mut self, kind: StepKind, factory: usize, items: Vec<ItemId>, pinned: bool) -> StepHandle {
        debug_assert!(matches!(kind, StepKind::Pickup | StepKind::Delivery));
        let handle = StepHandle(self.slots.len() as u32);
        self.slots.push(StepSlot {
            kind,
            factory,
            items,
            partner: NONE,
            pinned,
            pred: NONE,
            succ: NONE,
        });
        handle
    }

    /// Creates a fresh empty route: two sentinels, `begin` linked directly to `end`.
    pub fn new_route(&mut self) -> Route {
        let begin = self.alloc_sentinel(StepKind::Begin);
        let end = self.alloc_sentinel(StepKind::End);
        self.slot_mut(begin).succ = end;
        self.slot_mut(end).pred = begin;
        Route { begin, end }
    }

    pub fn kind(&self, h: StepHandle) -> StepKind {
        self.slot(h).kind
    }

    pub fn factory(&self, h: StepHandle) -> usize {
        self.slot(h).factory
    }

    pub fn items(&self, h: StepHandle) -> &[ItemId] {
        &self.slot(h).items
    }

    pub fn pinned(&self, h: StepHandle) -> bool {
        self.slot(h).pinned
    }

    pub fn mark_pinned(&mut self, h: StepHandle) {
        self.slot_mut(h).pinned = true;
    }

    pub fn partner(&self, h: StepHandle) -> Option<StepHandle> {
        let p = self.slot(h).partner;
        (!p.is_none()).then_some(p)
    }

    pub fn set_partner(&mut self, a: StepHandle, b: StepHandle) {
        self.slot_mut(a).partner = b;
        self.slot_mut(b).partner = a;
    }

    pub fn pred(&self, h: StepHandle) -> StepHandle {
        self.slot(h).pred
    }

    pub fn succ(&self, h: StepHandle) -> StepHandle {
        self.slot(h).succ
    }

    pub fn is_detached(&self, h: StepHandle) -> bool {
        let s = self.slot(h);
        s.pred.is_none() && s.succ.is_none()
    }

    /// Splices a detached `step` immediately after `anchor`.
    ///
    /// Fails (assertion) if `step` is attached, or `anchor` has no successor
    /// (i.e. is a route's `end` sentinel) — spec.md §4.1.
    pub fn insert_after(&mut self, step: StepHandle, anchor: StepHandle) {
        self.insert_segment_after(step, step, anchor);
    }

    /// Splices a detached contiguous run `first..=last` after `anchor` in one step.
    pub fn insert_segment_after(&mut self, first: StepHandle, last: StepHandle, anchor: StepHandle) {
        assert!(
            self.slot(first).pred.is_none(),
            "segment must be detached before insertion"
        );
        assert!(
            self.slot(last).succ.is_none(),
            "segment must be detached before insertion"
        );
        let anchor_succ = self.slot(anchor).succ;
        assert!(
            !anchor_succ.is_none(),
            "cannot insert after a node with no successor (end sentinel)"
        );
        self.slot_mut(last).succ = anchor_succ;
        self.slot_mut(anchor_succ).pred = last;
        self.slot_mut(first).pred = anchor;
        self.slot_mut(anchor).succ = first;
    }

    /// Detaches an interior `step`. Fails on sentinels.
    pub fn remove(&mut self, step: StepHandle) {
        self.remove_segment(step, step);
    }

    /// Detaches a contiguous interior run `first..=last`.
    pub fn remove_segment(&mut self, first: StepHandle, last: StepHandle) {
        let pred = self.slot(first).pred;
        let succ = self.slot(last).succ;
        assert!(
            !pred.is_none() && !succ.is_none(),
            "cannot remove a sentinel or an already-detached segment"
        );
        self.slot_mut(pred).succ = succ;
        self.slot_mut(succ).pred = pred;
        self.slot_mut(first).pred = NONE;
        self.slot_mut(last).succ = NONE;
    }

    /// Iterator over `start..until` (`until` excluded), stepping via `succ`.
    fn run(&self, start: StepHandle, until: StepHandle) -> RunIter<'_> {
        RunIter {
            arena: self,
            current: start,
            until,
        }
    }

    /// Steps strictly after `step`, excluding the owning route's `end`.
    ///
    /// Mirrors `LLNode.following_factory_nodes` in the original implementation.
    pub fn following<'a>(&'a self, step: StepHandle, route: &Route) -> impl Iterator<Item = StepHandle> + 'a {
        self.run(self.slot(step).succ, route.end)
    }
}

struct RunIter<'a> {
    arena: &'a StepArena,
    current: StepHandle,
    until: StepHandle,
}

impl<'a> Iterator for RunIter<'a> {
    type Item = StepHandle;

    fn next(&mut self) -> Option<StepHandle> {
        if self.current == self.until {
            return None;
        }
        let cur = self.current;
        self.current = self.arena.slot(cur).succ;
        Some(cur)
    }
}

/// One vehicle's slice of a [`StepArena`]: just the two sentinel handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub begin: StepHandle,
    pub end: StepHandle,
}

impl Route {
    pub fn is_empty(&self, arena: &StepArena) -> bool {
        arena.slot(self.begin).succ == self.end
    }

    pub fn first(&self, arena: &StepArena) -> Option<StepHandle> {
        (!self.is_empty(arena)).then(|| arena.slot(self.begin).succ)
    }

    pub fn last(&self, arena: &StepArena) -> Option<StepHandle> {
        (!self.is_empty(arena)).then(|| arena.slot(self.end).pred)
    }

    /// Interior steps only (excludes both sentinels).
    pub fn interior<'a>(&self, arena: &'a StepArena) -> impl Iterator<Item = StepHandle> + 'a {
        arena.run(arena.slot(self.begin).succ, self.end)
    }

    /// `begin` followed by every interior step — every valid `insert_after` anchor.
    pub fn interior_plus_begin<'a>(&self, arena: &'a StepArena) -> impl Iterator<Item = StepHandle> + 'a {
        let begin = self.begin;
        std::iter::once(begin).chain(self.interior(arena))
    }

    /// Every step including both sentinels.
    pub fn all<'a>(&self, arena: &'a StepArena) -> impl Iterator<Item = StepHandle> + 'a {
        let begin = self.begin;
        let end = self.end;
        std::iter::once(begin)
            .chain(self.interior(arena))
            .chain(std::iter::once(end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(arena: &mut StepArena, factory: usize, items: Vec<ItemId>) -> (StepHandle, StepHandle) {
        let p = arena.alloc(StepKind::Pickup, factory, items.clone(), false);
        let mut rev = items;
        rev.reverse();
        let d = arena.alloc(StepKind::Delivery, factory, rev, false);
        arena.set_partner(p, d);
        (p, d)
    }

    #[test]
    fn empty_route_has_only_sentinels() {
        let mut arena = StepArena::new();
        let route = arena.new_route();
        assert!(route.is_empty(&arena));
        assert_eq!(route.interior(&arena).count(), 0);
        assert_eq!(route.all(&arena).count(), 2);
    }

    #[test]
    fn insert_and_remove_round_trip() {
        let mut arena = StepArena::new();
        let route = arena.new_route();
        let (p1, d1) = pair(&mut arena, 0, vec![ItemId::new("i1")]);
        let (p2, d2) = pair(&mut arena, 1, vec![ItemId::new("i2")]);

        arena.insert_after(p1, route.begin);
        arena.insert_after(d1, p1);
        arena.insert_after(p2, d1);
        arena.insert_after(d2, p2);

        let before: Vec<_> = route.interior(&arena).collect();
        assert_eq!(before, vec![p1, d1, p2, d2]);

        // remove and reinsert the middle couple; the route must return to the
        // exact same interior sequence (undo correctness, spec.md §8).
        let pred = arena.pred(p2);
        arena.remove_segment(p2, d2);
        assert_eq!(route.interior(&arena).collect::<Vec<_>>(), vec![p1, d1]);
        arena.insert_segment_after(p2, d2, pred);
        assert_eq!(route.interior(&arena).collect::<Vec<_>>(), before);
    }

    #[test]
    fn following_excludes_self_and_end() {
        let mut arena = StepArena::new();
        let route = arena.new_route();
        let (p1, d1) = pair(&mut arena, 0, vec![ItemId::new("i1")]);
        let (p2, d2) = pair(&mut arena, 1, vec![ItemId::new("i2")]);
        arena.insert_after(p1, route.begin);
        arena.insert_after(d1, p1);
        arena.insert_after(p2, d1);
        arena.insert_after(d2, p2);

        let following: Vec<_> = arena.following(p1, &route).collect();
        assert_eq!(following, vec![d1, p2, d2]);
    }

    #[test]
    #[should_panic]
    fn insert_after_end_panics() {
        let mut arena = StepArena::new();
        let route = arena.new_route();
        let p = arena.alloc(StepKind::Pickup, 0, vec![ItemId::new("i1")], false);
        arena.insert_after(p, route.end);
    }

    #[test]
    #[should_panic]
    fn double_insert_panics() {
        let mut arena = StepArena::new();
        let route = arena.new_route();
        let p = arena.alloc(StepKind::Pickup, 0, vec![ItemId::new("i1")], false);
        arena.insert_after(p, route.begin);
        arena.insert_after(p, route.begin);
    }

    // spec.md §8 "Undo correctness": the neighborhood enumerators in
    // `local_search` rely on every temporary remove/insert being exactly
    // reversible. Exercise that over arbitrary routes and arbitrary
    // relocation targets rather than just the couple of hand-picked cases above.
    mod undo_correctness {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn remove_then_reinsert_elsewhere_then_undo_restores_interior_sequence(
                factories in prop::collection::vec(0usize..4, 2..8),
                remove_idx in any::<usize>(),
                anchor_idx in any::<usize>(),
            ) {
                let mut arena = StepArena::new();
                let route = arena.new_route();
                let mut handles = Vec::new();
                for (i, f) in factories.iter().enumerate() {
                    let (p, d) = pair(&mut arena, *f, vec![ItemId::new(format!("i{i}"))]);
                    let anchor = route.last(&arena).unwrap_or(route.begin);
                    arena.insert_after(p, anchor);
                    arena.insert_after(d, p);
                    handles.push(p);
                    handles.push(d);
                }
                let before: Vec<StepHandle> = route.interior(&arena).collect();

                let step = before[remove_idx % before.len()];
                let original_pred = arena.pred(step);
                arena.remove(step);

                let anchors: Vec<StepHandle> = route.interior_plus_begin(&arena).collect();
                let relocate_anchor = anchors[anchor_idx % anchors.len()];
                arena.insert_after(step, relocate_anchor);

                // undo: detach from the trial position and restore the original link.
                arena.remove(step);
                arena.insert_after(step, original_pred);

                let after: Vec<StepHandle> = route.interior(&arena).collect();
                prop_assert_eq!(after, before);
            }
        }
    }
}

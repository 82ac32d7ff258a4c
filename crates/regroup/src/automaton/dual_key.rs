//! Dual-key edge store.

use std::hash::Hash;

use indexmap::IndexMap;

/// A map keyed by ordered pairs `(a, b)` that can list every pair sharing
/// an `a` key or every pair sharing a `b` key without scanning.
///
/// Both indexes are updated together by every operation, and a key whose
/// last pair is removed disappears from its index. Iteration follows
/// insertion order, and removals keep the order of the remaining pairs, so
/// repeated runs over the same input visit pairs in the same order.
#[derive(Debug, Clone)]
pub struct DualKeyMap<A, B, V> {
    forward: IndexMap<A, IndexMap<B, V>>,
    backward: IndexMap<B, IndexMap<A, V>>,
}

impl<A, B, V> DualKeyMap<A, B, V>
where
    A: Copy + Eq + Hash,
    B: Copy + Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            forward: IndexMap::new(),
            backward: IndexMap::new(),
        }
    }

    /// Insert or replace the item of `(a, b)`, returning the previous one.
    pub fn insert(&mut self, a: A, b: B, item: V) -> Option<V> {
        self.backward.entry(b).or_default().insert(a, item.clone());
        self.forward.entry(a).or_default().insert(b, item)
    }

    pub fn get(&self, a: A, b: B) -> Option<&V> {
        self.forward.get(&a)?.get(&b)
    }

    pub fn contains(&self, a: A, b: B) -> bool {
        self.get(a, b).is_some()
    }

    /// Remove the pair `(a, b)` from both indexes.
    pub fn remove(&mut self, a: A, b: B) -> Option<V> {
        if let Some(inner) = self.backward.get_mut(&b) {
            inner.shift_remove(&a);
            if inner.is_empty() {
                self.backward.shift_remove(&b);
            }
        }
        let inner = self.forward.get_mut(&a)?;
        let item = inner.shift_remove(&b);
        if inner.is_empty() {
            self.forward.shift_remove(&a);
        }
        item
    }

    /// Remove and return some pair, or `None` if the map is empty.
    pub fn pop_any(&mut self) -> Option<(A, B, V)> {
        let (&a, inner) = self.forward.first()?;
        let (&b, _) = inner.first()?;
        let item = self.remove(a, b)?;
        Some((a, b, item))
    }

    /// Remove every pair whose first key is `a`.
    pub fn remove_a(&mut self, a: A) {
        let Some(inner) = self.forward.shift_remove(&a) else {
            return;
        };
        for b in inner.keys() {
            if let Some(mirror) = self.backward.get_mut(b) {
                mirror.shift_remove(&a);
                if mirror.is_empty() {
                    self.backward.shift_remove(b);
                }
            }
        }
    }

    /// Remove every pair whose second key is `b`.
    pub fn remove_b(&mut self, b: B) {
        let Some(inner) = self.backward.shift_remove(&b) else {
            return;
        };
        for a in inner.keys() {
            if let Some(mirror) = self.forward.get_mut(a) {
                mirror.shift_remove(&b);
                if mirror.is_empty() {
                    self.forward.shift_remove(a);
                }
            }
        }
    }

    /// All `(b, item)` pairs under `a`.
    pub fn by_a(&self, a: A) -> Option<&IndexMap<B, V>> {
        self.forward.get(&a)
    }

    /// All `(a, item)` pairs under `b`.
    pub fn by_b(&self, b: B) -> Option<&IndexMap<A, V>> {
        self.backward.get(&b)
    }

    pub fn has_a(&self, a: A) -> bool {
        self.forward.contains_key(&a)
    }

    pub fn has_b(&self, b: B) -> bool {
        self.backward.contains_key(&b)
    }

    pub fn a_keys(&self) -> impl Iterator<Item = A> + '_ {
        self.forward.keys().copied()
    }

    pub fn b_keys(&self) -> impl Iterator<Item = B> + '_ {
        self.backward.keys().copied()
    }

    /// Every pair with its item, grouped by first key.
    pub fn iter(&self) -> impl Iterator<Item = (A, B, &V)> + '_ {
        self.forward
            .iter()
            .flat_map(|(&a, inner)| inner.iter().map(move |(&b, item)| (a, b, item)))
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.forward.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

impl<A, B, V> DualKeyMap<A, B, V>
where
    A: Copy + Eq + Hash + std::fmt::Debug,
    B: Copy + Eq + Hash + std::fmt::Debug,
    V: Clone + PartialEq,
{
    /// Verify that both indexes hold exactly the same pairs and that no key
    /// is left with an empty index entry.
    pub fn check_consistency(&self) -> Result<(), String> {
        for (a, inner) in &self.forward {
            if inner.is_empty() {
                return Err(format!("empty forward entry for {a:?}"));
            }
            for (b, item) in inner {
                if self.backward.get(b).and_then(|mirror| mirror.get(a)) != Some(item) {
                    return Err(format!("{a:?} -> {b:?} has no matching backward entry"));
                }
            }
        }
        for (b, inner) in &self.backward {
            if inner.is_empty() {
                return Err(format!("empty backward entry for {b:?}"));
            }
            for (a, item) in inner {
                if self.forward.get(a).and_then(|mirror| mirror.get(b)) != Some(item) {
                    return Err(format!("{b:?} <- {a:?} has no matching forward entry"));
                }
            }
        }
        Ok(())
    }
}

impl<A, B, V> Default for DualKeyMap<A, B, V>
where
    A: Copy + Eq + Hash,
    B: Copy + Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DualKeyMap<u32, u32, char> {
        let mut map = DualKeyMap::new();
        map.insert(0, 1, 'a');
        map.insert(0, 2, 'b');
        map.insert(3, 1, 'c');
        map
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut map = sample();
        assert_eq!(map.len(), 3);
        assert_eq!(map.get(0, 2), Some(&'b'));
        assert!(map.contains(3, 1));
        assert!(!map.contains(1, 3));
        assert_eq!(map.insert(0, 2, 'z'), Some('b'));
        assert_eq!(map.by_b(2).and_then(|m| m.get(&0)), Some(&'z'));
        assert_eq!(map.len(), 3);
        map.check_consistency().unwrap();
    }

    #[test]
    fn test_both_directions() {
        let map = sample();
        let targets: Vec<u32> = map.by_a(0).unwrap().keys().copied().collect();
        assert_eq!(targets, vec![1, 2]);
        let sources: Vec<u32> = map.by_b(1).unwrap().keys().copied().collect();
        assert_eq!(sources, vec![0, 3]);
        assert!(map.by_a(1).is_none());
    }

    #[test]
    fn test_remove_drops_empty_keys() {
        let mut map = sample();
        assert_eq!(map.remove(3, 1), Some('c'));
        assert!(!map.has_a(3));
        assert_eq!(map.by_b(1).unwrap().len(), 1);
        assert_eq!(map.remove(3, 1), None);
        map.check_consistency().unwrap();
    }

    #[test]
    fn test_remove_by_key() {
        let mut map = sample();
        map.remove_b(1);
        assert_eq!(map.len(), 1);
        assert!(!map.has_a(3));
        assert!(map.contains(0, 2));
        map.check_consistency().unwrap();

        let mut map = sample();
        map.remove_a(0);
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![(3, 1, &'c')]);
        assert!(!map.has_b(2));
        map.check_consistency().unwrap();
    }

    #[test]
    fn test_removal_keeps_insertion_order() {
        let mut map = DualKeyMap::new();
        for (a, b) in [(1, 10), (2, 20), (3, 30), (4, 40), (1, 11)] {
            map.insert(a, b, ());
        }
        map.remove(1, 10);
        map.remove_a(2);
        let pairs: Vec<(u32, u32)> = map.iter().map(|(a, b, ())| (a, b)).collect();
        assert_eq!(pairs, vec![(1, 11), (3, 30), (4, 40)]);
        assert_eq!(map.b_keys().collect::<Vec<_>>(), vec![30, 40, 11]);
        assert_eq!(map.pop_any(), Some((1, 11, ())));
        map.check_consistency().unwrap();
    }

    #[test]
    fn test_pop_any_drains() {
        let mut map = sample();
        let mut popped = Vec::new();
        while let Some(pair) = map.pop_any() {
            map.check_consistency().unwrap();
            popped.push(pair);
        }
        popped.sort_unstable();
        assert_eq!(popped, vec![(0, 1, 'a'), (0, 2, 'b'), (3, 1, 'c')]);
        assert!(map.is_empty());
        assert_eq!(map.b_keys().count(), 0);
    }
}

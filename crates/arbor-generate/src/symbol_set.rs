/// Growable bitset over symbol indices.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub(crate) struct SymbolSet {
    bits: Vec<u64>,
}

impl SymbolSet {
    const BITS_PER_SLOT: usize = u64::BITS as usize;

    pub(crate) fn with_capacity(symbols: usize) -> Self {
        Self { bits: vec![0; symbols.div_ceil(Self::BITS_PER_SLOT)] }
    }

    pub(crate) fn single(symbols: usize, symbol: usize) -> Self {
        let mut set = Self::with_capacity(symbols);
        set.insert(symbol);
        set
    }

    /// Returns `true` if `symbol` was not present.
    pub(crate) fn insert(&mut self, symbol: usize) -> bool {
        let slot = symbol / Self::BITS_PER_SLOT;
        if slot >= self.bits.len() {
            self.bits.resize(slot + 1, 0);
        }
        let mask = 1 << (symbol % Self::BITS_PER_SLOT);
        let added = self.bits[slot] & mask == 0;
        self.bits[slot] |= mask;
        added
    }

    pub(crate) fn contains(&self, symbol: usize) -> bool {
        let slot = symbol / Self::BITS_PER_SLOT;
        let mask = 1 << (symbol % Self::BITS_PER_SLOT);
        self.bits.get(slot).is_some_and(|bits| bits & mask != 0)
    }

    /// Adds every member of `other`. Returns `true` if anything changed.
    pub(crate) fn union_with(&mut self, other: &Self) -> bool {
        if other.bits.len() > self.bits.len() {
            self.bits.resize(other.bits.len(), 0);
        }
        let mut changed = false;
        for (slot, &bits) in self.bits.iter_mut().zip(&other.bits) {
            let merged = *slot | bits;
            changed |= merged != *slot;
            *slot = merged;
        }
        changed
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter().enumerate().flat_map(|(slot, &bits)| {
            (0..Self::BITS_PER_SLOT)
                .filter(move |bit| bits & (1 << bit) != 0)
                .map(move |bit| slot * Self::BITS_PER_SLOT + bit)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_reports_changes() {
        let mut a = SymbolSet::single(10, 3);
        let b = SymbolSet::single(200, 130);
        assert!(a.union_with(&b));
        assert!(!a.union_with(&b));
        assert!(a.contains(3) && a.contains(130));
        assert!(!a.contains(4));
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![3, 130]);
    }
}

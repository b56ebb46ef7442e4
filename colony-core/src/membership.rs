use crate::types::CellId;

const WORD_BITS: usize = u64::BITS as usize;

/// A dense bitset of cell indices.
///
/// Used for the engine's alive and candidate sets. Membership is stored as
/// one bit per [`CellId`], so lookups are O(1) and iteration always yields
/// indices in ascending order, which keeps the stepping loop deterministic.
///
/// The set grows on demand when an index beyond the current capacity is
/// inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSet {
    words: Vec<u64>,
    len: usize,
}

impl IndexSet {
    /// Creates an empty set with room for `capacity` indices.
    ///
    /// ### Parameters
    /// - `capacity` - Number of indices that can be stored without growing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(WORD_BITS)],
            len: 0,
        }
    }

    /// Adds `id` to the set.
    ///
    /// ### Returns
    /// `true` if `id` was not already present.
    pub fn insert(&mut self, id: CellId) -> bool {
        let (word, bit) = (id / WORD_BITS, id % WORD_BITS);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let mask = 1u64 << bit;
        if self.words[word] & mask != 0 {
            return false;
        }
        self.words[word] |= mask;
        self.len += 1;
        true
    }

    /// Removes `id` from the set.
    ///
    /// ### Returns
    /// `true` if `id` was present.
    pub fn remove(&mut self, id: CellId) -> bool {
        let (word, bit) = (id / WORD_BITS, id % WORD_BITS);
        let Some(w) = self.words.get_mut(word) else {
            return false;
        };
        let mask = 1u64 << bit;
        if *w & mask == 0 {
            return false;
        }
        *w &= !mask;
        self.len -= 1;
        true
    }

    #[inline]
    pub fn contains(&self, id: CellId) -> bool {
        self.words
            .get(id / WORD_BITS)
            .is_some_and(|w| w & (1u64 << (id % WORD_BITS)) != 0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Removes every index but keeps the allocated capacity.
    pub fn clear(&mut self) {
        for w in &mut self.words {
            *w = 0;
        }
        self.len = 0;
    }

    /// Returns an iterator over all member indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = CellId> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(wi * WORD_BITS + bit)
            })
        })
    }
}

impl FromIterator<CellId> for IndexSet {
    fn from_iter<I: IntoIterator<Item = CellId>>(iter: I) -> Self {
        let mut set = IndexSet::default();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

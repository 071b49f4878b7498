//! Growable bit set backed by 64-bit blocks.
//!
//! The wire form is the space-separated list of set-bit indices, used
//! identically by the encoder and the decoder.

/// A growable set of bit flags.
#[derive(Debug, Clone, Default)]
pub struct BitSet {
    blocks: Vec<u64>,
}

impl BitSet {
    /// Create an empty bit set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a bit set from set-bit indices.
    pub fn from_indices(indices: &[usize]) -> Self {
        let mut set = Self::new();
        for &i in indices {
            set.set(i);
        }
        set
    }

    /// Set bit `index`.
    pub fn set(&mut self, index: usize) {
        let block = index / 64;
        if block >= self.blocks.len() {
            self.blocks.resize(block + 1, 0);
        }
        self.blocks[block] |= 1 << (index % 64);
    }

    /// Clear bit `index`.
    pub fn clear(&mut self, index: usize) {
        let block = index / 64;
        if block < self.blocks.len() {
            self.blocks[block] &= !(1 << (index % 64));
        }
    }

    /// Whether bit `index` is set.
    pub fn get(&self, index: usize) -> bool {
        let block = index / 64;
        block < self.blocks.len() && (self.blocks[block] >> (index % 64)) & 1 == 1
    }

    /// True when no bit is set.
    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|&b| b == 0)
    }

    /// Number of set bits.
    pub fn count(&self) -> usize {
        self.blocks.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Iterate set-bit indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.blocks.iter().enumerate().flat_map(|(block, &bits)| {
            (0..64).filter_map(move |bit| {
                if (bits >> bit) & 1 == 1 {
                    Some(block * 64 + bit)
                } else {
                    None
                }
            })
        })
    }

    // Trailing zero blocks are representation noise, not content.
    fn significant(&self) -> &[u64] {
        let mut len = self.blocks.len();
        while len > 0 && self.blocks[len - 1] == 0 {
            len -= 1;
        }
        &self.blocks[..len]
    }
}

impl PartialEq for BitSet {
    fn eq(&self, other: &Self) -> bool {
        self.significant() == other.significant()
    }
}

impl Eq for BitSet {}

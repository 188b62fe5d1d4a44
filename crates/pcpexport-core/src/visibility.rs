//! Visibility predicates deciding which entities get exported.
//!
//! CPUs are selected by a bitmap over entity indices (bit 0 is the aggregate
//! "all" pseudo-CPU, bit `N + 1` is CPU `N`). Devices are selected by name.
//! A missing or empty selection exports everything.

use std::collections::HashSet;

/// Growable bitmap over entity indices.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CpuBitmap {
    words: Vec<u64>,
}

impl CpuBitmap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bitmap selecting the aggregate and the given CPU numbers.
    pub fn from_cpus(cpus: impl IntoIterator<Item = usize>) -> Self {
        let mut bm = Self::new();
        bm.set(0);
        for cpu in cpus {
            bm.set(cpu + 1);
        }
        bm
    }

    pub fn set(&mut self, index: usize) {
        let word = index / 64;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << (index % 64);
    }

    pub fn is_set(&self, index: usize) -> bool {
        self.words
            .get(index / 64)
            .is_some_and(|&w| w & (1u64 << (index % 64)) != 0)
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }
}

/// CPU visibility: everything, or the entities set in a bitmap.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CpuSelection {
    #[default]
    All,
    Bitmap(CpuBitmap),
}

impl CpuSelection {
    /// An empty bitmap selects nothing useful and is treated as "all".
    pub fn from_bitmap(bitmap: CpuBitmap) -> Self {
        if bitmap.is_empty() {
            CpuSelection::All
        } else {
            CpuSelection::Bitmap(bitmap)
        }
    }

    pub fn is_visible(&self, entity: usize) -> bool {
        match self {
            CpuSelection::All => true,
            CpuSelection::Bitmap(bm) => bm.is_set(entity),
        }
    }
}

/// Device name allow-list. `None` exports every device.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    names: Option<HashSet<String>>,
}

impl DeviceFilter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts export to the given names. An empty list means no filter.
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: HashSet<String> = names.into_iter().map(Into::into).collect();
        Self {
            names: (!set.is_empty()).then_some(set),
        }
    }

    pub fn is_visible(&self, name: &str) -> bool {
        self.names.as_ref().is_none_or(|set| set.contains(name))
    }
}

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::dataloader::error::{DatasetError, Result};

use super::{Dataset, Label, Sample, SharedDataset};

/// Seed used by every deterministic sub-sampling helper.
pub const SUBSET_SEED: u64 = 0;

/// A view of `inner` restricted to `indices`, in the given order.
pub struct Subset {
    inner: SharedDataset,
    indices: Vec<usize>,
}

impl Subset {
    pub fn new(inner: SharedDataset, indices: Vec<usize>) -> Result<Self> {
        let len = inner.len();
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(DatasetError::IndexOutOfBounds { index, len });
        }
        Ok(Self { inner, indices })
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

impl Dataset for Subset {
    fn len(&self) -> usize {
        self.indices.len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        let inner_index = self.inner_index(index)?;
        self.inner.get(inner_index)
    }

    fn label(&self, index: usize) -> Result<Label> {
        let inner_index = self.inner_index(index)?;
        self.inner.label(inner_index)
    }
}

impl Subset {
    fn inner_index(&self, index: usize) -> Result<usize> {
        self.indices
            .get(index)
            .copied()
            .ok_or(DatasetError::IndexOutOfBounds {
                index,
                len: self.indices.len(),
            })
    }
}

/// The first `length` samples, optionally after a seeded permutation.
pub fn subset_with_len(dataset: SharedDataset, length: usize, shuffle: bool) -> Result<Subset> {
    let len = dataset.len();
    if length > len {
        return Err(DatasetError::SubsetTooLarge {
            requested: length,
            len,
        });
    }

    let mut indices: Vec<usize> = (0..len).collect();
    if shuffle {
        let mut rng = StdRng::seed_from_u64(SUBSET_SEED);
        indices.shuffle(&mut rng);
    }
    indices.truncate(length);

    Subset::new(dataset, indices)
}

/// Keep the samples whose label is one of `classes`.
pub fn subclass_dataset(dataset: SharedDataset, classes: &[Label]) -> Result<Subset> {
    let mut indices = Vec::new();
    for index in 0..dataset.len() {
        if classes.contains(&dataset.label(index)?) {
            indices.push(index);
        }
    }
    log::debug!(
        "Kept {} of {} samples for classes {:?}",
        indices.len(),
        dataset.len(),
        classes
    );
    Subset::new(dataset, indices)
}

#[rustfmt::skip]
const CIFAR100_COARSE: [Label; 100] = [
    4, 1, 14, 8, 0, 6, 7, 7, 18, 3, 3,
    14, 9, 18, 7, 11, 3, 9, 7, 11, 6, 11, 5,
    10, 7, 6, 13, 15, 3, 15, 0, 11, 1, 10,
    12, 14, 16, 9, 11, 5, 5, 19, 8, 8, 15,
    13, 14, 17, 18, 10, 16, 4, 17, 4, 2, 0,
    17, 4, 18, 17, 10, 3, 2, 12, 12, 16, 12,
    1, 9, 19, 2, 10, 0, 1, 16, 12, 9, 13,
    15, 13, 16, 19, 2, 4, 6, 19, 5, 5, 8,
    19, 18, 1, 2, 15, 6, 0, 17, 8, 14, 13,
];

/// Map a CIFAR-100 fine label to its coarse superclass. Labels outside
/// `0..100` pass through unchanged.
pub fn sparse2coarse(fine: Label) -> Label {
    usize::try_from(fine)
        .ok()
        .and_then(|i| CIFAR100_COARSE.get(i).copied())
        .unwrap_or(fine)
}

#[rustfmt::skip]
const CIFAR100_SUPERCLASS: [[Label; 5]; 20] = [
    [4, 31, 55, 72, 95],
    [1, 33, 67, 73, 91],
    [54, 62, 70, 82, 92],
    [9, 10, 16, 29, 61],
    [0, 51, 53, 57, 83],
    [22, 25, 40, 86, 87],
    [5, 20, 26, 84, 94],
    [6, 7, 14, 18, 24],
    [3, 42, 43, 88, 97],
    [12, 17, 38, 68, 76],
    [23, 34, 49, 60, 71],
    [15, 19, 21, 32, 39],
    [35, 63, 64, 66, 75],
    [27, 45, 77, 79, 99],
    [2, 11, 36, 46, 98],
    [28, 30, 44, 78, 93],
    [37, 50, 65, 74, 80],
    [47, 52, 56, 59, 96],
    [8, 13, 48, 58, 90],
    [41, 69, 81, 85, 89],
];

fn one_class_each(n: Label) -> Vec<Vec<Label>> {
    (0..n).map(|c| vec![c]).collect()
}

/// Class groups that count as "normal" in one-class experiments.
pub fn superclass_list(dataset: &str) -> Vec<Vec<Label>> {
    match dataset {
        "cifar10" | "cifar10-corruption" | "svhn" | "svhn-10-corruption" | "svhn-10"
        | "fashion-mnist" | "mnist" => one_class_each(10),
        "cifar100" => CIFAR100_SUPERCLASS.iter().map(|g| g.to_vec()).collect(),
        "imagenet30" => one_class_each(2),
        "cifar100-corruption" => one_class_each(20),
        "imagenet" => one_class_each(30),
        _ => one_class_each(2),
    }
}

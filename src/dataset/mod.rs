//! Indexed access contract shared by every dataset adapter.
//!
//! A dataset is a fixed collection of samples, each one an image plus an
//! integer label. Labels are `0` for normal / in-distribution samples, `1` for
//! anomalies, or a dense class index for multi-class sources.

pub mod subset;
pub mod tensor;
pub mod transforms;

use std::sync::Arc;

use crate::dataloader::error::{DatasetError, Result};

pub use tensor::Tensor;

pub type Label = i64;

pub const NORMAL: Label = 0;
pub const ANOMALY: Label = 1;

/// The tensors a transform produced for one image.
#[derive(Debug, Clone, PartialEq)]
pub enum Views {
    Single(Tensor),
    /// Two independently augmented views of the same image.
    Pair(Tensor, Tensor),
    /// `views` augmented views plus one deterministic clean view.
    List { views: Vec<Tensor>, clean: Tensor },
}

impl Views {
    pub fn len(&self) -> usize {
        match self {
            Views::Single(_) => 1,
            Views::Pair(_, _) => 2,
            Views::List { views, .. } => views.len() + 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// The first view, or the clean one for [`Views::List`].
    pub fn primary(&self) -> &Tensor {
        match self {
            Views::Single(t) | Views::Pair(t, _) => t,
            Views::List { clean, .. } => clean,
        }
    }

    /// All tensors in a fixed order, clean view last.
    pub fn into_vec(self) -> Vec<Tensor> {
        match self {
            Views::Single(t) => vec![t],
            Views::Pair(a, b) => vec![a, b],
            Views::List { mut views, clean } => {
                views.push(clean);
                views
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub views: Views,
    pub label: Label,
}

pub trait Dataset: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Result<Sample>;

    /// Label of a sample. Adapters holding a label vector override this so
    /// filtering never has to decode images.
    fn label(&self, index: usize) -> Result<Label> {
        self.get(index).map(|sample| sample.label)
    }
}

pub type SharedDataset = Arc<dyn Dataset>;

impl<D: Dataset + ?Sized> Dataset for Arc<D> {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        (**self).get(index)
    }

    fn label(&self, index: usize) -> Result<Label> {
        (**self).label(index)
    }
}

pub(crate) fn check_index(index: usize, len: usize) -> Result<()> {
    if index >= len {
        return Err(DatasetError::IndexOutOfBounds { index, len });
    }
    Ok(())
}

pub(crate) fn check_lengths(samples: usize, labels: usize) -> Result<()> {
    if samples != labels {
        return Err(DatasetError::LengthMismatch { samples, labels });
    }
    Ok(())
}

use ndarray::Array4;

use crate::dataset::Label;

/// One stacked batch. `views[k]` holds view `k` of every sample as
/// `(batch, channels, height, width)`.
#[derive(Debug, Clone)]
pub struct DataBatch {
    pub views: Vec<Array4<f32>>,
    pub labels: Vec<Label>,
    pub batch_number: usize,
}

impl DataBatch {
    pub fn samples_in_batch(&self) -> usize {
        self.labels.len()
    }

    /// The first view, or the only one for single-view transforms.
    pub fn images(&self) -> Option<&Array4<f32>> {
        self.views.first()
    }

    /// Flat `f32` copy of the first view in row-major order.
    pub fn to_f32(&self) -> Vec<f32> {
        self.images()
            .map(|images| images.iter().copied().collect())
            .unwrap_or_default()
    }
}

use std::collections::BTreeMap;

use crate::dataset::{Dataset, Label};

use super::dataloader::DataLoader;
use super::error::Result;

/// Count of every label in `dataset`.
pub fn label_histogram(dataset: &dyn Dataset) -> Result<BTreeMap<Label, usize>> {
    let mut counts = BTreeMap::new();
    for index in 0..dataset.len() {
        *counts.entry(dataset.label(index)?).or_insert(0) += 1;
    }
    Ok(counts)
}

/// Size of the final batch when incomplete batches are kept.
pub fn last_batch_size(total: usize, batch_size: usize) -> usize {
    match total % batch_size {
        0 if total > 0 => batch_size,
        rest => rest,
    }
}

pub fn print_dataset_info(name: &str, dl: &DataLoader) -> Result<()> {
    let total_size = dl.len();
    let config = dl.config();
    let histogram = label_histogram(dl.dataset().as_ref())?;

    println!("Dataset Information: {name}");
    println!("-------------------");
    println!("Total size: {}", total_size);
    println!("Batch size: {}", config.batch_size);
    println!("Batches: {}", dl.num_batches());
    if config.drop_last {
        println!("Dropped samples: {}", total_size % config.batch_size);
    } else {
        println!(
            "Last batch size: {}",
            last_batch_size(total_size, config.batch_size)
        );
    }
    println!();
    println!("Labels:");
    for (label, count) in &histogram {
        let share = if total_size == 0 {
            0.0
        } else {
            *count as f64 / total_size as f64 * 100.0
        };
        println!("  {label}: {count} ({share:.2}%)");
    }
    println!();
    println!("Shuffle: {}", config.shuffle);
    println!("Seed: {:?}", config.shuffle_seed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::transforms::Compose;
    use crate::datasets::ArrayImages;
    use ndarray::ArrayD;

    #[test]
    fn histogram_counts_labels() {
        let images = ArrayD::zeros(vec![5, 2, 2]);
        let labels = vec![0, 1, 1, 0, 1];
        let dataset = ArrayImages::new(images, labels, Compose::new().into_shared()).unwrap();
        let histogram = label_histogram(&dataset).unwrap();
        assert_eq!(histogram.get(&0), Some(&2));
        assert_eq!(histogram.get(&1), Some(&3));
    }

    #[test]
    fn full_last_batch_reports_batch_size() {
        assert_eq!(last_batch_size(16, 4), 4);
        assert_eq!(last_batch_size(10, 4), 2);
        assert_eq!(last_batch_size(3, 4), 3);
        assert_eq!(last_batch_size(0, 4), 0);
    }
}

use std::path::PathBuf;

use anyhow::{bail, Context};

use ood_datasets::dataloader::info::print_dataset_info;
use ood_datasets::{get_dataset, DataLoader, LoaderConfig, Settings};

const USAGE: &str = "usage: ood-datasets <dataset> [settings.json] [--test-only]";

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut name = None;
    let mut settings_path = None;
    let mut test_only = false;
    for arg in std::env::args().skip(1) {
        if arg == "--test-only" {
            test_only = true;
        } else if arg == "-h" || arg == "--help" {
            println!("{USAGE}");
            return Ok(());
        } else if name.is_none() {
            name = Some(arg);
        } else if settings_path.is_none() {
            settings_path = Some(PathBuf::from(arg));
        } else {
            bail!("unexpected argument {arg}\n{USAGE}");
        }
    }
    let Some(name) = name else {
        bail!(USAGE);
    };

    let settings = match &settings_path {
        Some(path) => Settings::from_json_file(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => Settings::default(),
    };

    let splits = get_dataset(&settings, &name, test_only)
        .with_context(|| format!("failed to build dataset {name}"))?;
    println!("Image size: {}", splits.image_size);
    println!("Classes: {}", splits.n_classes);
    println!();

    let config = || LoaderConfig {
        shuffle: false,
        ..Default::default()
    };

    if let Some(train) = splits.train {
        let dl = DataLoader::new(train, Some(config()))?;
        print_dataset_info(&format!("{name} (train)"), &dl)?;
        println!();
    }
    let dl = DataLoader::new(splits.test, Some(config()))?;
    print_dataset_info(&format!("{name} (test)"), &dl)?;

    Ok(())
}

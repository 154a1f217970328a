pub mod config;
pub mod data_batch;
pub mod dataloader;
pub mod datasource;
pub mod error;
pub mod info;
pub mod par_iter;

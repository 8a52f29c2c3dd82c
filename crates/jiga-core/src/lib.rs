pub mod catalog;
pub mod config;
pub mod credentials;
pub mod error;
pub mod loader;
pub mod records;
pub mod seed;
pub mod timestamps;
pub mod uploader;

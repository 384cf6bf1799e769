mod client;
pub mod libraries;

pub use client::Downloader;
pub use libraries::ArtifactFetcher;

pub mod manifest;
pub mod resolver;
pub mod rules;
pub mod version_file;

pub use manifest::{VersionEntry, VersionManifest};
pub use resolver::{
    ArgumentForm, ArtifactDescriptor, AssetIndexRef, GameSpecification, LaunchArguments,
    LaunchTemplates, LibraryRequirement, LoggingConfig, VersionResolver,
};
pub use version_file::{DownloadInfo, VersionJson};

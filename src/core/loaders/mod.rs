pub mod context;
pub mod fabric;
pub mod forge;
pub mod forge_archive;
pub mod forge_installer;
pub mod installer;
pub mod patcher;

pub use context::InstallContext;
pub use forge::ForgeVersion;
pub use installer::{Installer, LoaderInstaller, ModLoaderRequest};

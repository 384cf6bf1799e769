// ─── Ironlaunch Core ───
// Launch pipeline for Minecraft, vanilla or with a mod loader.
//
// Architecture:
//   core/
//     version/    Mojang manifest, version files, OS rules, inheritance
//     downloader/ Verified downloads of libraries and the client jar
//     assets/     Asset index and objects, shared or local
//     loaders/    Forge (archive and installer) and Fabric
//     auth/       Microsoft device code, Xbox Live, Minecraft services
//     launch/     Argument expansion and the game process
//     java/       Java probe through the launcher bridge
//     launcher    Startup state and the launch entry point

pub mod assets;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod downloader;
pub mod error;
pub mod hash;
pub mod http;
pub mod java;
pub mod launch;
pub mod launcher;
pub mod loaders;
pub mod lock;
pub mod pages;
pub mod paths;
pub mod platform;
pub mod process;
pub mod profiles;
pub mod version;

#[cfg(test)]
pub(crate) mod testing;

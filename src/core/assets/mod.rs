pub mod asset_index;

pub use asset_index::{fetch_assets, AssetIndex, AssetLayout, AssetStore};

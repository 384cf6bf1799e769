pub mod args;
pub mod natives;
pub mod pipeline;
pub mod task;

pub use args::{ArgumentContext, LaunchArgumentBuilder};
pub use pipeline::{launch, LaunchContext};
pub use task::{ExpandedLaunch, GameProcess};

mod builder;
pub mod files;
mod front_matter;
mod highlight;
mod markdown;
mod pattern;
pub mod pipeline;
mod render;
pub mod source;
mod watch;

pub use builder::Builder;
pub use watch::{ChangeBatch, FileWatcher, PathFilter, watch_targets};

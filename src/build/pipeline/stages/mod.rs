//! Default pipeline stages.
//!
//! The site pipeline consists of:
//!
//! 1. **LayoutDefaultStage** - Assign layouts from path rules
//! 2. **DraftStage** - Drop files flagged as drafts
//! 3. **MarkdownStage** - Convert markdown to HTML fragments
//! 4. **HighlightStage** - Highlight fenced code blocks
//! 5. **CollectionsStage** - Group and sort files into collections
//! 6. **LayoutStage** - Wrap content in its layout template
//! 7. **AssetStage** - Copy static asset directories
//! 8. **LiveReloadStage** - Inject the reload client into every HTML page (serve only)

mod assets;
mod collections;
mod default_layouts;
mod drafts;
mod highlight;
mod layouts;
mod live_reload;
mod markdown;

pub use assets::AssetStage;
pub use collections::CollectionsStage;
pub use default_layouts::LayoutDefaultStage;
pub use drafts::DraftStage;
pub use highlight::HighlightStage;
pub use layouts::LayoutStage;
pub use live_reload::{LIVE_RELOAD_ENDPOINT, LiveReloadStage};
pub use markdown::MarkdownStage;

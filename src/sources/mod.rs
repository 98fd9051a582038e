pub mod traits;
pub mod html_table;
pub mod rss_atom;
pub mod registry;

pub use traits::{FeedReader, ReaderKind};
pub use registry::ReaderRegistry;

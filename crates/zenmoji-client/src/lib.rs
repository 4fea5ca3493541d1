pub mod editor;
pub mod provider;

pub use editor::{HtmlEditorExtractor, PageInfo};
pub use provider::{HttpProvider, HttpProviderFactory, ProviderOptions};

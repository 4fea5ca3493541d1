pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod message;
pub mod models;
pub mod parser;
pub mod prompt;
pub mod rate_limiter;
pub mod suggest;
pub mod text;
pub mod traits;
pub mod validator;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use cache::{CacheConfig, CacheStats, SuggestionCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SuggestConfig;
pub use error::AppError;
pub use message::{MessageRequest, MessageResponse, handle_json, handle_message};
pub use models::{
    CacheEntry, FavoriteEmoji, HistoryEntry, ProviderKind, Settings, Suggestion, SuggestionSet,
    compute_hash,
};
pub use prompt::PromptBuilder;
pub use rate_limiter::{RateLimitConfig, RateLimiter};
pub use suggest::{ConnectionReport, SuggestionService};
pub use text::{MarkdownExtractor, TextConfig};
pub use traits::{NullStore, Provider, ProviderFactory, SuggestionStore, TextExtractor};

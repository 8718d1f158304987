/// External capability abstractions
///
/// The two upstreams the recommendation pipeline depends on — a
/// text-completion LLM and a movie/TV metadata database — sit behind
/// traits so implementations can be swapped and tests can script them.
/// Both are treated as unreliable: they may be unreachable, return
/// non-success statuses, or (for completions) return text that fails the
/// requested format.
use crate::{
    error::AppResult,
    models::{ContentKind, ResolvedTitle, TitleDetails},
};

pub mod open_ai;
pub mod tmdb;

pub use open_ai::OpenAiCompletionProvider;
pub use tmdb::TmdbMetadataResolver;

/// Text-completion capability
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Returns a single completion for the given system instruction and
    /// user prompt
    ///
    /// The returned text is opaque at this layer; interpreting it is the
    /// caller's problem.
    async fn complete(&self, system_instruction: &str, user_prompt: &str) -> AppResult<String>;
}

/// Movie/TV metadata capability
///
/// "Not found" is a normal outcome for both operations, never an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Best-effort canonical id + poster lookup for a title name and
    /// optional year
    async fn resolve(
        &self,
        kind: ContentKind,
        name: &str,
        year: Option<i32>,
    ) -> AppResult<Option<ResolvedTitle>>;

    /// Full metadata record for a known id
    async fn details(&self, kind: ContentKind, id: i64) -> AppResult<Option<TitleDetails>>;
}

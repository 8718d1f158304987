pub mod recommendation;
pub mod session;
pub mod tmdb;

pub use recommendation::{ContentKind, Recommendation, ResolvedTitle, TitleDetails};
pub use session::{KnownTitle, Session};

use crate::storage::{MovieFilter, MovieRepository, StorageResult, normalize_title};
use serde::Serialize;
use tracing::info;

/// Outcome of a single vote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteResult {
    pub title: String,
    pub votes: i64,
}

/// Record one vote for `title` and return the post-increment count.
///
/// Relies on the repository's atomic increment; no locking happens here.
pub async fn cast_vote(movies: &dyn MovieRepository, title: &str) -> StorageResult<VoteResult> {
    let title = normalize_title(title);
    let votes = movies.increment_vote(&MovieFilter::by_title(&title)).await?;

    info!(title = %title, votes, "Vote recorded");

    Ok(VoteResult { title, votes })
}

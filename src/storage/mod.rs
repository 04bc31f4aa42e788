pub mod memory;
pub mod mongo;

pub use memory::InMemoryMovieStore;
pub use mongo::MongoMovieStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A movie document, keyed by its lower-cased title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub title: String,
    #[serde(rename = "moviedetail", default)]
    pub detail: MovieDetail,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(rename = "releaseYear", default, skip_serializing_if = "Option::is_none")]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub votes: i64,
}

impl Movie {
    pub fn new(title: &str, detail: MovieDetail) -> Self {
        Self {
            title: normalize_title(title),
            detail,
        }
    }
}

/// Case-fold a title into its lookup key
pub fn normalize_title(title: &str) -> String {
    title.to_lowercase()
}

/// Selects movies by title, or everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovieFilter {
    title: Option<String>,
}

impl MovieFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_title(title: &str) -> Self {
        Self {
            title: Some(normalize_title(title)),
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn matches(&self, movie: &Movie) -> bool {
        self.title.as_deref().is_none_or(|t| movie.title == t)
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no movie matched the filter")]
    NotFound,

    #[error("query failed: {0}")]
    Query(String),

    #[error("failed to decode movie document: {0}")]
    Decode(String),

    #[error("insert failed: {0}")]
    Insert(String),

    #[error("delete failed: {0}")]
    Delete(String),

    #[error("vote increment failed: {0}")]
    Vote(String),

    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    #[error("cannot reach movie store: {0}")]
    Connect(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// All I/O against the movie collection goes through this trait.
#[async_trait]
pub trait MovieRepository: Send + Sync + 'static {
    /// Every movie matching `filter`. A single undecodable document fails the whole call.
    async fn find_all(&self, filter: &MovieFilter) -> StorageResult<Vec<Movie>>;

    /// The first movie matching `filter`, or `StorageError::NotFound`.
    async fn find_one(&self, filter: &MovieFilter) -> StorageResult<Movie>;

    /// Write `movie` unconditionally and return the store-assigned id.
    /// Titles are not checked for uniqueness.
    async fn insert(&self, movie: &Movie) -> StorageResult<String>;

    /// Remove at most one matching movie, returning how many were removed.
    async fn delete_one(&self, filter: &MovieFilter) -> StorageResult<u64>;

    /// Atomically add one vote to the matching movie, creating it when absent,
    /// and return the post-increment count.
    async fn increment_vote(&self, filter: &MovieFilter) -> StorageResult<i64>;

    async fn ping(&self) -> StorageResult<()>;

    /// Release the underlying handle. Calls made afterwards may fail.
    async fn shutdown(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_folds_title_case() {
        let filter = MovieFilter::by_title("Inception");
        assert_eq!(filter.title(), Some("inception"));
        assert!(filter.matches(&Movie::new("INCEPTION", MovieDetail::default())));
        assert!(!filter.matches(&Movie::new("Tenet", MovieDetail::default())));
        assert!(MovieFilter::all().matches(&Movie::new("Tenet", MovieDetail::default())));
    }

    #[test]
    fn detail_uses_wire_field_names() {
        let detail = MovieDetail {
            director: Some("Nolan".to_string()),
            genre: None,
            release_year: Some(2010),
            votes: 0,
        };

        let value = serde_json::to_value(Movie::new("Inception", detail)).unwrap();
        assert_eq!(value["title"], "inception");
        assert_eq!(value["moviedetail"]["releaseYear"], 2010);
        assert_eq!(value["moviedetail"]["votes"], 0);
        assert!(value["moviedetail"].get("genre").is_none());
    }

    #[test]
    fn votes_default_to_zero() {
        let detail: MovieDetail = serde_json::from_str(r#"{"director":"Nolan"}"#).unwrap();
        assert_eq!(detail.votes, 0);
        assert_eq!(detail.director.as_deref(), Some("Nolan"));
    }

    #[test]
    fn wrong_field_types_do_not_decode() {
        assert!(serde_json::from_str::<MovieDetail>(r#"{"releaseYear":"2010"}"#).is_err());
    }
}

use super::{Movie, MovieDetail, MovieFilter, MovieRepository, StorageResult, StorageError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

struct StoredMovie {
    id: u64,
    movie: Movie,
}

/// Process-local movie store.
///
/// Keeps insertion order and allows duplicate titles, like the document store.
#[derive(Default)]
pub struct InMemoryMovieStore {
    movies: RwLock<Vec<StoredMovie>>,
    next_id: AtomicU64,
}

impl InMemoryMovieStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[async_trait]
impl MovieRepository for InMemoryMovieStore {
    async fn find_all(&self, filter: &MovieFilter) -> StorageResult<Vec<Movie>> {
        let movies = self.movies.read().await;
        Ok(movies
            .iter()
            .filter(|stored| filter.matches(&stored.movie))
            .map(|stored| stored.movie.clone())
            .collect())
    }

    async fn find_one(&self, filter: &MovieFilter) -> StorageResult<Movie> {
        let movies = self.movies.read().await;
        movies
            .iter()
            .find(|stored| filter.matches(&stored.movie))
            .map(|stored| stored.movie.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn insert(&self, movie: &Movie) -> StorageResult<String> {
        let id = self.allocate_id();
        self.movies.write().await.push(StoredMovie {
            id,
            movie: movie.clone(),
        });

        debug!(id, title = %movie.title, "Stored movie in memory");
        Ok(id.to_string())
    }

    async fn delete_one(&self, filter: &MovieFilter) -> StorageResult<u64> {
        let mut movies = self.movies.write().await;
        match movies.iter().position(|stored| filter.matches(&stored.movie)) {
            Some(index) => {
                let removed = movies.remove(index);
                debug!(id = removed.id, "Removed movie from memory");
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn increment_vote(&self, filter: &MovieFilter) -> StorageResult<i64> {
        let mut movies = self.movies.write().await;

        if let Some(stored) = movies.iter_mut().find(|stored| filter.matches(&stored.movie)) {
            let votes = stored
                .movie
                .detail
                .votes
                .checked_add(1)
                .ok_or_else(|| StorageError::Vote("vote counter overflow".to_string()))?;
            stored.movie.detail.votes = votes;
            return Ok(votes);
        }

        // Upsert needs a title to key the new document on.
        let title = filter
            .title()
            .ok_or_else(|| StorageError::Vote("cannot upsert without a title".to_string()))?;

        let movie = Movie {
            title: title.to_string(),
            detail: MovieDetail {
                votes: 1,
                ..MovieDetail::default()
            },
        };
        movies.push(StoredMovie {
            id: self.allocate_id(),
            movie,
        });

        Ok(1)
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }
}

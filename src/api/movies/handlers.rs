use crate::api::models::*;
use crate::storage::{Movie, MovieDetail, MovieFilter, normalize_title};
use crate::vote::{VoteResult, cast_vote};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use std::collections::BTreeMap;
use tracing::info;

pub async fn create_movie_handler(
    State(state): State<AppState>,
    Path(title): Path<String>,
    body: Result<Json<MovieDetail>, JsonRejection>,
) -> Result<Json<MovieDetail>, AppError> {
    let title = normalize_title(&title);
    info!(title = %title, "Create movie request");

    let Json(detail) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let movie = Movie::new(&title, detail);
    let id = state.movies.insert(&movie).await?;

    info!(id = %id, title = %movie.title, "Movie inserted");

    Ok(Json(movie.detail))
}

/// Every movie, keyed by title
pub async fn list_movies_handler(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, MovieDetail>>, AppError> {
    info!("List movies request");

    let movies = state.movies.find_all(&MovieFilter::all()).await?;

    Ok(Json(
        movies
            .into_iter()
            .map(|movie| (movie.title, movie.detail))
            .collect(),
    ))
}

pub async fn get_movie_handler(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> Result<Json<Movie>, AppError> {
    let title = normalize_title(&title);
    info!(title = %title, "Get movie request");
    let filter = MovieFilter::by_title(&title);

    Ok(Json(state.movies.find_one(&filter).await?))
}

pub async fn delete_movie_handler(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let title = normalize_title(&title);
    info!(title = %title, "Delete movie request");
    let filter = MovieFilter::by_title(&title);

    let count = state.movies.delete_one(&filter).await?;

    Ok(Json(DeleteResponse { count }))
}

pub async fn vote_handler(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> Result<Json<VoteResult>, AppError> {
    info!(title = %normalize_title(&title), "Vote request");

    Ok(Json(cast_vote(state.movies.as_ref(), &title).await?))
}

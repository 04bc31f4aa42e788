use crate::api::models::AppState;
use crate::api::movies::handlers::{
    create_movie_handler, delete_movie_handler, get_movie_handler, list_movies_handler,
    vote_handler,
};
use axum::{Router, routing::get};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/movies", get(list_movies_handler))
        .route(
            "/movies/{title}",
            get(get_movie_handler)
                .post(create_movie_handler)
                .delete(delete_movie_handler),
        )
        .route("/movies/{title}/vote", get(vote_handler))
}

//! Catalogue API clients
//!
//! - TMDB: movie/TV listings, search, and IMDb id lookup

pub mod tmdb;

pub use tmdb::{TmdbClient, TmdbError};

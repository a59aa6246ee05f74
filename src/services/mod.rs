pub mod discovery;
pub mod exclusion;
pub mod poster;
pub mod providers;
pub mod recommendations;
pub mod registry;

pub use poster::{PosterEnricher, PosterSource, TmdbPosterClient};
pub use providers::{CatalogProvider, JikanProvider, TraktProvider};

pub mod extract;
pub mod handlers;
pub mod identity;
pub mod routes;
pub mod state;

pub use identity::CurrentUser;
pub use routes::create_router;
pub use state::{AppState, Catalogs};

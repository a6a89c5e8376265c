pub mod auth;
pub mod context;
pub mod server;
pub mod types;


pub use auth::SessionStore;
pub use context::AppState;
pub use server::run_server;

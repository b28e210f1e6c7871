pub mod api;
pub mod conn;
pub mod core;
mod extractor;
pub mod store;
pub mod util;

pub use api::{make_app, AppState};
pub use util::config::Config;

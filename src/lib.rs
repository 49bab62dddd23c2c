pub mod compiler;
pub mod dsl;
pub mod error;
pub mod library;
pub mod logging;
pub mod paths;
pub mod settings;
pub mod state;
pub mod store;

#[cfg(feature = "server")]
pub mod api;

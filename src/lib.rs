// Library surface for the binary, headless integration tests and reuse.
pub mod app;
pub mod app_dirs;
pub mod auth;
pub mod config;
pub mod controller;
pub mod event_source;
pub mod export;
pub mod form;
pub mod roll_grid;
pub mod routes;
pub mod runtime;
pub mod scan;
pub mod session;
pub mod sink;
pub mod summary;
pub mod timer;
pub mod ui;

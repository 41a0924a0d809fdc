//! # Stocktake
//!
//! A self-hostable IT asset register, usable both as a standalone binary and
//! as a library. Tracks devices, their assignment and lifecycle status, keeps
//! an append-only audit trail of changes, and serves a statistics dashboard.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::path::PathBuf;
//! use stocktake::server::{AppState, create_router, staging::ImportStaging};
//! use stocktake::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new(&PathBuf::from("./data/stocktake.db")).unwrap();
//! store.initialize().unwrap();
//! store.seed_reference_data().unwrap();
//!
//! let state = Arc::new(AppState {
//!     store: Arc::new(store),
//!     staging: ImportStaging::new(),
//! });
//! let router = create_router(state);
//! // Serve with axum...
//! ```

pub mod auth;
pub mod config;
pub mod csv;
pub mod error;
pub mod server;
pub mod store;
pub mod types;

mod account;
mod assets;
mod audit;
pub mod cache;
mod dashboard;
mod directory;
pub mod dto;
mod export;
mod import;
mod reference;
pub mod response;
mod router;
pub mod staging;
mod users;
pub mod validation;

pub use router::{AppState, create_router};

mod helpers;
mod middleware;
mod token;

pub use middleware::{
    AdminOnly, Capability, CreateAssets, DeleteAssets, EditAssets, ImportAssets, Require,
    RequireUser, ViewAudit,
};
pub use token::{TokenGenerator, parse_token};

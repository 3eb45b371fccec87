pub mod auth;
pub mod changeset_handlers;
pub mod element_handlers;
pub mod handlers;
pub mod relation_handlers;
pub mod response;
pub mod routes;

pub use auth::BasicAuth;
pub use handlers::*;
pub use response::Xml;
pub use routes::*;

pub mod change;
pub mod changeset;
pub mod common;
pub mod element;
pub mod user;

pub use change::*;
pub use changeset::*;
pub use common::*;
pub use element::*;
pub use user::*;

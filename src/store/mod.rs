pub mod dataset;
pub mod membership;
pub mod memory;
pub mod traits;

pub use dataset::*;
pub use membership::*;
pub use memory::*;
pub use traits::*;

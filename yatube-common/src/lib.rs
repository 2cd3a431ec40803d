pub mod model;
pub mod pagination;
pub mod permission;
pub mod util;

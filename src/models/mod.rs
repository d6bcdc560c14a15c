pub mod page;
pub mod project;

pub use page::*;
pub use project::*;

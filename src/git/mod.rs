pub mod diff;
pub mod history;
pub mod line_diff;
pub mod repository;
pub mod tree;

pub use history::RevWalk;
pub use repository::Repository;

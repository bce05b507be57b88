pub mod drive;
pub mod target;

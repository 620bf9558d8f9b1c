pub mod page;
pub mod picture;

pub mod catalog;
pub mod universalis;

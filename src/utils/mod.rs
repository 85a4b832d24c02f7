pub mod array;
pub mod bytes;

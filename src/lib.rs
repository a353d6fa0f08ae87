#![doc = include_str!("../README.md")]

pub use weft_sync as sync;
pub use weft_task as task;

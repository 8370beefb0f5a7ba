pub mod common;
pub mod matching;
pub mod resolve;

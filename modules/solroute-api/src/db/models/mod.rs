pub mod credential;
pub mod operation;

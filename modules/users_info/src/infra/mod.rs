pub mod objects;
pub mod storage;

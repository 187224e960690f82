pub mod storage;
pub mod tokener;

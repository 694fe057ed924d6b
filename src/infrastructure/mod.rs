pub mod notifications;
pub mod scanner;
pub mod storage;

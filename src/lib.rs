pub mod bench;
pub mod conf;
pub mod core;
pub mod storage;

#[cfg(feature = "testutil")]
pub mod testutil;

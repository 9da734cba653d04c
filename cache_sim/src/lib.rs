pub mod addr;
pub mod cache;
pub mod memory;
pub mod sim;

#[cfg(feature = "stat")]
pub mod stat;

pub mod address;
pub mod amount;
pub mod chat;
pub mod config;
pub mod error;
pub mod frontend;
pub mod monitor;
pub mod notify;
pub mod payment;

#[cfg(test)]
pub(crate) mod testing;

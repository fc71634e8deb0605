//! Core value types shared across the admission pipeline.

pub mod identifier;
pub mod mint;
pub mod payment;
pub mod settle;

pub use identifier::Identifier;
pub use mint::{CapacityInfo, MintRequest};
pub use payment::{PaymentAuthorization, PaymentChallenge};
pub use settle::SettleItem;

// Copyright (c) 2024 Botho Foundation

//! Transaction and message types.

mod message;
mod tx;

pub use message::*;
pub use tx::{AuthInfo, Fee, PubKey, SignerInfo, Tx, TxBody, MAX_GAS_WANTED};

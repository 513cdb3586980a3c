//! # Gatewayエンドポイント
//!
//! - `ANY /sign`, `ANY /sign/{name}`: 署名フローへのリダイレクト
//! - `GET /callback`: 署名後の戻り先
//! - `POST /webhook`: ベンダーからの状態変化通知

pub mod callback;
pub mod sign;
pub mod webhook;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use callback::handle_callback;
pub use sign::{handle_sign, handle_sign_named};
pub use webhook::handle_webhook;

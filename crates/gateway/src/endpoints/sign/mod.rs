//! # ANY /sign
//!
//! `path` で指定された文書に署名ゾーンを付け、エンベロープを作成して
//! ベンダーの署名画面へ307でリダイレクトする。

mod handler;


pub use handler::{handle_sign, handle_sign_named};

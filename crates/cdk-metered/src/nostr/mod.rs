//! Private token transfer over Nostr

pub mod gift_store;
pub mod gift_wrap;
pub mod identity;

pub use self::gift_store::GiftStore;
pub use self::gift_wrap::{
    is_valid_cashu_gift_wrap, looks_like_gift_wrap, unwrap, verify_and_decrypt, wrap, GiftPayload,
    GiftWrap,
};
pub use self::identity::{parse_public_key, Identity};

//! Property-based tests for the codec, crypto engine and fingerprints

mod blob_codec;
mod crypto_roundtrip;

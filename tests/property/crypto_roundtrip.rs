//! Crypto engine properties: round-trip and tamper detection

use dotvault::crypto::{decrypt, encrypt, CryptoKey};
use dotvault::error::CryptoError;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn decrypt_inverts_encrypt(
        plaintext in prop::collection::vec(any::<u8>(), 0..4096),
        material in prop::collection::vec(any::<u8>(), 1..64),
    ) {
        let key = CryptoKey::from_material(&material).unwrap();
        let token = encrypt(&plaintext, &key).unwrap();
        let decrypted = decrypt(&token, &key).unwrap();
        prop_assert_eq!(decrypted.as_slice(), plaintext.as_slice());
    }

    #[test]
    fn any_flipped_byte_is_detected(
        plaintext in prop::collection::vec(any::<u8>(), 0..512),
        position in any::<prop::sample::Index>(),
        flip in 1u8..=255,
    ) {
        let key = CryptoKey::from_material(b"tamper key").unwrap();
        let mut token = encrypt(&plaintext, &key).unwrap();
        let i = position.index(token.len());
        token[i] ^= flip;
        prop_assert!(matches!(
            decrypt(&token, &key),
            Err(CryptoError::DecryptionFailed)
        ));
    }
}

#[test]
fn test_other_key_is_rejected() {
    let token = encrypt(b"secret", &CryptoKey::from_material(b"one").unwrap()).unwrap();
    let result = decrypt(&token, &CryptoKey::from_material(b"two").unwrap());
    assert!(matches!(result, Err(CryptoError::DecryptionFailed)));
}

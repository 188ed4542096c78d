//! Blob filename codec properties

use chrono::{TimeZone, Utc};
use dotvault::blob::{BlobName, EntryKind};
use dotvault::tree::hasher::ContentHash;
use proptest::prelude::*;

fn entry_name() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9._-]{1,24}".prop_filter("not a dot directory", |s| s != "." && s != "..")
}

fn timestamp() -> impl Strategy<Value = chrono::DateTime<Utc>> {
    // 2000-01-01 .. 2100-01-01
    (946_684_800i64..4_102_444_800i64).prop_map(|secs| Utc.timestamp_opt(secs, 0).unwrap())
}

fn kind() -> impl Strategy<Value = EntryKind> {
    prop_oneof![Just(EntryKind::File), Just(EntryKind::Directory)]
}

proptest! {
    #[test]
    fn decode_inverts_encode(
        name in entry_name(),
        hash in "[0-9a-f]{8}",
        ts in timestamp(),
        kind in kind(),
        conflict in any::<bool>(),
    ) {
        let mut blob = BlobName::new(&name, kind, ContentHash::parse(&hash).unwrap(), ts).unwrap();
        if conflict {
            blob = blob.as_conflict();
        }
        let decoded = BlobName::decode(&blob.encode()).unwrap();
        prop_assert_eq!(decoded.name(), name.as_str());
        prop_assert_eq!(decoded.hash().as_str(), hash.as_str());
        prop_assert_eq!(decoded.timestamp(), ts);
        prop_assert_eq!(decoded.kind(), kind);
        prop_assert_eq!(decoded.is_conflict(), conflict);
    }

    #[test]
    fn wrong_segment_counts_are_rejected(
        segments in prop::collection::vec("[a-zA-Z0-9]{0,6}", 1..10)
            .prop_filter("not 5 or 6 segments", |s| s.len() != 5 && s.len() != 6),
    ) {
        prop_assert!(BlobName::decode(&segments.join("#")).is_err());
    }

    #[test]
    fn garbage_in_known_shape_is_rejected(
        name in entry_name(),
        hash in "[0-9a-f]{8}",
        ts in "[0-9]{14}",
        kind in "[A-Z]",
        marker in "[A-Z]{5}",
    ) {
        let filename = format!("{}#{}#{}#{}#{}", name, hash, ts, kind, marker);
        let valid_kind = kind == "F" || kind == "D";
        let valid_marker = marker == "CRYPT";
        if !(valid_kind && valid_marker) {
            prop_assert!(BlobName::decode(&filename).is_err());
        }
    }
}

//! Integration tests for the VSMETA codec.
//!
//! Tests cover:
//! - NFO to VSMETA byte layout
//! - Decoding every edition back to the same metadata
//! - Preservation of unknown tags
//! - Truncated and corrupted records

use chrono::{TimeZone, Utc};
use nfo2vsmeta::codec::{self, tags, CodecOptions, Entry, FormatEdition};
use nfo2vsmeta::core::nfo_reader::NfoReader;
use nfo2vsmeta::models::config::ReaderConfig;
use nfo2vsmeta::models::metadata::{Actor, Artwork, MetadataModel};
use nfo2vsmeta::utils::hash::md5_hex;
use nfo2vsmeta::Error;

fn options(edition: FormatEdition) -> CodecOptions {
    CodecOptions {
        edition,
        ..Default::default()
    }
}

fn full_model() -> MetadataModel {
    MetadataModel {
        title: "千と千尋の神隠し".to_string(),
        original_title: Some("Spirited Away".to_string()),
        sort_title: Some("Spirited Away".to_string()),
        tagline: Some("Nothing that happens is ever forgotten".to_string()),
        plot: Some("A girl wanders into a world of spirits.".to_string()),
        year: 2001,
        rating: Some(8.5),
        mpaa: Some("PG".to_string()),
        premiered: Some("2001-07-20".to_string()),
        runtime: Some(125),
        id: Some("tt0245429".to_string()),
        genres: vec!["Animation".to_string(), "Fantasy".to_string()],
        actors: vec![Actor::new("Rumi Hiiragi"), Actor::new("Miyu Irino")],
        directors: vec!["Hayao Miyazaki".to_string()],
        writers: vec!["Hayao Miyazaki".to_string()],
        studios: vec!["Studio Ghibli".to_string()],
        poster: Some(Artwork::from_bytes(b"\x89PNG poster".to_vec())),
        backdrop: Some(Artwork {
            generated_at: Utc.timestamp_opt(1_600_000_000, 0).single(),
            ..Artwork::from_bytes(b"\xFF\xD8 backdrop".to_vec())
        }),
    }
}

// ========== LAYOUT TESTS ==========

#[test]
fn test_nfo_to_standard_bytes() {
    let reader = NfoReader::new(ReaderConfig::default());
    let model = reader
        .parse("<movie><title>Foo</title><year>2020</year><rating>4.5</rating></movie>")
        .unwrap();

    let bytes = codec::encode(&model, &CodecOptions::default()).unwrap();

    let mut expected = b"VSM\x02\x00\x00\x00".to_vec();
    expected.extend_from_slice(&[0x01, 0x03, b'F', b'o', b'o']);
    expected.push(0x04);
    expected.extend_from_slice(&2020u32.to_le_bytes());
    expected.push(0x05);
    expected.extend_from_slice(&9.0f32.to_le_bytes());
    assert_eq!(bytes, expected);
}

#[test]
fn test_utf16_edition_text_layout() {
    let bytes = codec::encode(&MetadataModel::with_title("Hi"), &options(FormatEdition::Utf16)).unwrap();
    assert_eq!(&bytes[..7], b"VSM\x03\x00\x00\x00");
    assert_eq!(&bytes[7..], &[0x01, 0x04, b'H', 0x00, b'i', 0x00]);
}

#[test]
fn test_artwork_group_carries_checksum_of_base64() {
    let model = full_model();
    let record = codec::decode(&codec::encode(&model, &CodecOptions::default()).unwrap()).unwrap();

    let poster = record.group(tags::POSTER).unwrap();
    let image = poster
        .iter()
        .find_map(|e| match e {
            Entry::Field { tag, value } if *tag == tags::group::IMAGE => Some(value.clone()),
            _ => None,
        })
        .unwrap();
    let codec::Value::Bytes(base64_image) = image else {
        panic!("image should be bytes");
    };
    assert!(base64_image.iter().all(u8::is_ascii));
    assert!(poster.contains(&Entry::field(
        tags::group::CHECKSUM,
        codec::Value::Text(md5_hex(&base64_image))
    )));

    let backdrop = record.group(tags::BACKDROP).unwrap();
    assert!(backdrop.contains(&Entry::field(
        tags::group::TIMESTAMP,
        codec::Value::UInt32(1_600_000_000)
    )));
    assert!(record.verify_checksums().is_ok());
}

// ========== ROUND TRIP TESTS ==========

#[test]
fn test_every_edition_decodes_to_the_same_model() {
    let model = full_model();
    let generated_at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

    for edition in [FormatEdition::Legacy, FormatEdition::Standard, FormatEdition::Utf16] {
        let bytes = codec::encode_at(&model, &options(edition), generated_at).unwrap();
        let record = codec::decode(&bytes).unwrap();

        assert_eq!(record.edition, edition);
        assert_eq!(record.to_model().unwrap(), model, "edition {}", edition);
        assert_eq!(codec::encode_record(&record).unwrap(), bytes);
    }
}

#[test]
fn test_terminated_record_round_trips() {
    let opts = CodecOptions {
        terminator: true,
        ..Default::default()
    };
    let bytes = codec::encode(&MetadataModel::with_title("End"), &opts).unwrap();
    let record = codec::decode(&bytes).unwrap();

    assert!(record.terminated);
    assert_eq!(codec::encode_record(&record).unwrap(), bytes);
}

#[test]
fn test_unknown_tags_are_preserved() {
    let mut bytes = b"VSM\x02\x00\x00\x00".to_vec();
    bytes.extend_from_slice(&[0x01, 0x01, b'X']);
    bytes.extend_from_slice(&[0x11, 0x02, 0xAA, 0xBB]);
    bytes.extend_from_slice(&[0x8A, 0x01, 0x05, 0x07, 0x03, 0x01, 0x02, 0x03]);

    let record = codec::decode(&bytes).unwrap();
    assert_eq!(record.opaque_count(), 2);
    assert_eq!(record.text(tags::TITLE), Some("X"));
    assert_eq!(codec::encode_record(&record).unwrap(), bytes);

    let model = record.to_model().unwrap();
    assert_eq!(model.title, "X");
    assert!(model.poster.is_none());
}

// ========== ERROR TESTS ==========

#[test]
fn test_truncated_record() {
    let bytes = codec::encode(&full_model(), &CodecOptions::default()).unwrap();

    let err = codec::decode(&bytes[..bytes.len() - 1]).unwrap_err();
    assert!(matches!(err, Error::TruncatedRecord { .. }), "{:?}", err);
    assert!(err.is_decode_error());

    assert!(matches!(
        codec::decode(&bytes[..5]),
        Err(Error::TruncatedRecord { .. })
    ));
}

#[test]
fn test_bad_magic() {
    assert!(matches!(
        codec::decode(b"XSM\x02\x00\x00\x00"),
        Err(Error::BadMagic(_))
    ));
    assert!(matches!(
        codec::decode(b"VSM\x09\x00\x00\x00"),
        Err(Error::BadMagic(_))
    ));
}

#[test]
fn test_corrupted_checksum_is_detected() {
    let model = MetadataModel {
        poster: Some(Artwork::from_bytes(b"poster".to_vec())),
        ..MetadataModel::with_title("P")
    };
    let mut bytes = codec::encode(&model, &CodecOptions::default()).unwrap();

    let checksum = md5_hex(b"cG9zdGVy");
    let at = bytes
        .windows(checksum.len())
        .position(|w| w == checksum.as_bytes())
        .unwrap();
    bytes[at] = if bytes[at] == b'0' { b'1' } else { b'0' };

    let record = codec::decode(&bytes).unwrap();
    assert!(matches!(
        record.verify_checksums(),
        Err(Error::ChecksumMismatch { tag, .. }) if tag == tags::POSTER
    ));
}

#[test]
fn test_overlong_varint_is_rejected() {
    let mut bytes = b"VSM\x02\x00\x00\x00".to_vec();
    bytes.extend_from_slice(&[0x81, 0x80, 0x80]);
    assert!(matches!(
        codec::decode_with_limit(&bytes, 2),
        Err(Error::InvalidVarint { offset: 7, .. })
    ));
}

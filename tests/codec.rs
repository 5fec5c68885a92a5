// Codec laws over randomly generated schemas and events.

use fdb_ringbridge::Codec::{ByteOrder, Codec, Event, FieldKind, FieldValue, Schema};
use fdb_ringbridge::CodecError;

const WIDTHS: [usize; 4] = [1, 2, 4, 8];

fn mask(width: usize) -> u64 {
    if width == 8 {
        u64::MAX
    } else {
        (1 << (width * 8)) - 1
    }
}

fn random_schema(rng: &mut fastrand::Rng) -> Schema {
    let mut builder = Schema::builder().byte_order(if rng.bool() {
        ByteOrder::Little
    } else {
        ByteOrder::Big
    });
    for i in 0..rng.usize(1..10) {
        let width = WIDTHS[rng.usize(..WIDTHS.len())];
        builder = match rng.u8(..3) {
            0 => builder.unsigned(format!("u{}", i), width),
            1 => builder.signed(format!("s{}", i), width),
            _ => builder.array(format!("a{}", i), width, rng.usize(1..8)),
        };
    }
    builder.build().unwrap()
}

fn random_event(rng: &mut fastrand::Rng, schema: &Schema) -> Event {
    let mut event = Event::new();
    for field in schema.fields() {
        let value = match field.kind {
            FieldKind::Scalar {
                width,
                signed: false,
            } => FieldValue::unsigned(width, rng.u64(..) & mask(width)),
            FieldKind::Scalar {
                width,
                signed: true,
            } => FieldValue::signed(width, rng.i64(..)),
            FieldKind::Array {
                element_width,
                count,
            } => FieldValue::Array {
                element_width,
                values: (0..count)
                    .map(|_| rng.u64(..) & mask(element_width))
                    .collect(),
            },
        };
        event.insert(field.name.clone(), value);
    }
    event
}

#[test]
fn decode_inverts_encode() {
    let mut rng = fastrand::Rng::with_seed(0x5eed);
    for _ in 0..200 {
        let schema = random_schema(&mut rng);
        let codec = Codec::new(schema.clone());
        let event = random_event(&mut rng, &schema);

        let raw = codec.encode(&event).unwrap();
        assert_eq!(raw.len(), schema.total_size());
        assert_eq!(codec.decode(&raw).unwrap(), event);
    }
}

#[test]
fn decode_inverts_encode_for_any_field_order() {
    let mut rng = fastrand::Rng::with_seed(0x0de5);
    for _ in 0..200 {
        let schema = random_schema(&mut rng);
        let codec = Codec::new(schema.clone());

        let mut fields: Vec<_> = random_event(&mut rng, &schema)
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        rng.shuffle(&mut fields);
        let mut event = Event::new();
        for (name, value) in fields {
            event.insert(name, value);
        }

        let back = codec.decode(&codec.encode(&event).unwrap()).unwrap();
        assert_eq!(back, event, "event {} decoded as {}", event, back);
    }
}

#[test]
fn decode_matches_event_built_out_of_schema_order() {
    let schema = Schema::builder()
        .unsigned("a", 1)
        .unsigned("b", 1)
        .build()
        .unwrap();
    let codec = Codec::new(schema);

    let mut event = Event::new();
    event.insert("b", FieldValue::u8(2));
    event.insert("a", FieldValue::u8(1));

    let raw = codec.encode(&event).unwrap();
    assert_eq!(raw, vec![1, 2]);
    assert_eq!(codec.decode(&raw).unwrap(), event);
}

#[test]
fn decode_is_total_for_correctly_sized_input() {
    let mut rng = fastrand::Rng::with_seed(42);
    for _ in 0..200 {
        let schema = random_schema(&mut rng);
        let codec = Codec::new(schema.clone());
        let raw: Vec<u8> = (0..schema.total_size()).map(|_| rng.u8(..)).collect();

        let event = codec.decode(&raw).unwrap();
        assert_eq!(event.len(), schema.len());
        // Encoding a decoded record reproduces the input bytes
        assert_eq!(codec.encode(&event).unwrap(), raw);
    }
}

#[test]
fn decode_rejects_any_other_length() {
    let schema = Schema::builder()
        .unsigned("ifindex", 4)
        .array("addr", 1, 6)
        .build()
        .unwrap();
    let codec = Codec::new(schema);
    let buf = vec![0xaa; 64];

    for len in (0..64).filter(|&l| l != 10) {
        assert_eq!(
            codec.decode(&buf[..len]),
            Err(CodecError::RecordSizeMismatch {
                expected: 10,
                actual: len
            })
        );
    }
}

#[test]
fn encode_requires_every_schema_field() {
    let schema = Schema::builder()
        .unsigned("a", 2)
        .unsigned("b", 2)
        .build()
        .unwrap();
    let codec = Codec::new(schema);

    let mut event = Event::new();
    event.insert("a", FieldValue::u16(1));
    assert_eq!(
        codec.encode(&event),
        Err(CodecError::MissingField("b".into()))
    );
}

#[test]
fn encode_rejects_mismatched_kinds() {
    let schema = Schema::builder()
        .unsigned("flags", 1)
        .array("addr", 1, 6)
        .build()
        .unwrap();
    let codec = Codec::new(schema);

    let cases = [
        ("flags", FieldValue::u16(1)),
        ("flags", FieldValue::i8(1)),
        ("flags", FieldValue::text("on")),
        ("flags", FieldValue::bytes(&[1])),
        ("addr", FieldValue::bytes(&[1, 2, 3])),
        ("addr", FieldValue::u8(0)),
        ("addr", FieldValue::text("00:01:02:03:04:05")),
        (
            "addr",
            FieldValue::Array {
                element_width: 1,
                values: vec![0, 0, 0, 0, 0, 256],
            },
        ),
    ];

    for (name, value) in cases {
        let mut event = Event::new();
        event.insert("flags", FieldValue::u8(0));
        event.insert("addr", FieldValue::bytes(&[0; 6]));
        event.insert(name, value.clone());

        match codec.encode(&event) {
            Err(CodecError::TypeMismatch { field, .. }) => assert_eq!(field, name),
            other => panic!("{} = {:?} encoded as {:?}", name, value, other),
        }
    }
}

#[test]
fn encode_ignores_unknown_fields() {
    let schema = Schema::builder().unsigned("vid", 2).build().unwrap();
    let codec = Codec::new(schema);

    let mut event = Event::new();
    event.insert("note", FieldValue::text("display only"));
    event.insert("vid", FieldValue::u16(0x1234));
    event.insert("extra", FieldValue::u64(1));

    assert_eq!(codec.encode(&event).unwrap(), vec![0x34, 0x12]);
}

//! Typed field codec for the binary wire format.
//!
//! Every value travels under a caller-supplied tag; the stream itself never
//! says what comes next. Layouts:
//!
//! ```text
//! byte     1 byte
//! short    2 bytes, big-endian signed
//! int      4 bytes, big-endian signed
//! long     8 bytes, big-endian signed
//! boolean  1 byte, 0 = false, non-zero = true
//! string   4-byte signed length (-1 = null), then that many UTF-8 bytes
//! bytes    4-byte signed length (-1 = null), then that many raw bytes
//! strings  concatenation of length-prefixed strings; the count is supplied
//!          out of band by the operation, never embedded in the stream
//! ```

use crate::error::ProtocolError;
use bytes::{BufMut, BytesMut};
use std::io::Read;

/// Wire type identifier for decoding a single response field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTag {
    Byte,
    Short,
    Int,
    Long,
    Boolean,
    String,
    Bytes,
}

/// A single typed wire value.
///
/// `String` and `Bytes` are optional: a `-1` length prefix means null and
/// round-trips as `None`, distinct from the empty value. `Strings` is the
/// encode-side composite for a run of length-prefixed strings.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Byte(u8),
    Short(i16),
    Int(i32),
    Long(i64),
    Boolean(bool),
    String(Option<String>),
    Strings(Vec<String>),
    Bytes(Option<Vec<u8>>),
}

impl Field {
    /// Convenience constructor for a non-null string field.
    pub fn string(s: impl Into<String>) -> Self {
        Field::String(Some(s.into()))
    }

    /// Appends this field's wire form to `buf`.
    pub fn encode(&self, buf: &mut BytesMut) {
        match self {
            Field::Byte(v) => buf.put_u8(*v),
            Field::Short(v) => buf.put_i16(*v),
            Field::Int(v) => buf.put_i32(*v),
            Field::Long(v) => buf.put_i64(*v),
            Field::Boolean(v) => buf.put_u8(u8::from(*v)),
            Field::String(v) => put_blob(buf, v.as_ref().map(|s| s.as_bytes())),
            Field::Strings(vs) => {
                for s in vs {
                    put_blob(buf, Some(s.as_bytes()));
                }
            }
            Field::Bytes(v) => put_blob(buf, v.as_deref()),
        }
    }
}

fn put_blob(buf: &mut BytesMut, data: Option<&[u8]>) {
    match data {
        Some(d) => {
            buf.put_i32(d.len() as i32);
            buf.put_slice(d);
        }
        None => buf.put_i32(-1),
    }
}

/// Decodes one field of the given tag from the stream.
pub fn decode(tag: FieldTag, reader: &mut impl Read) -> Result<Field, ProtocolError> {
    match tag {
        FieldTag::Byte => Ok(Field::Byte(read_u8(reader)?)),
        FieldTag::Short => Ok(Field::Short(read_i16(reader)?)),
        FieldTag::Int => Ok(Field::Int(read_i32(reader)?)),
        FieldTag::Long => Ok(Field::Long(read_i64(reader)?)),
        FieldTag::Boolean => Ok(Field::Boolean(read_bool(reader)?)),
        FieldTag::String => Ok(Field::String(read_string(reader)?)),
        FieldTag::Bytes => Ok(Field::Bytes(read_bytes(reader)?)),
    }
}

pub fn read_u8(reader: &mut impl Read) -> Result<u8, ProtocolError> {
    Ok(read_array::<1>(reader)?[0])
}

pub fn read_bool(reader: &mut impl Read) -> Result<bool, ProtocolError> {
    Ok(read_array::<1>(reader)?[0] != 0)
}

pub fn read_i16(reader: &mut impl Read) -> Result<i16, ProtocolError> {
    Ok(i16::from_be_bytes(read_array::<2>(reader)?))
}

pub fn read_i32(reader: &mut impl Read) -> Result<i32, ProtocolError> {
    Ok(i32::from_be_bytes(read_array::<4>(reader)?))
}

pub fn read_i64(reader: &mut impl Read) -> Result<i64, ProtocolError> {
    Ok(i64::from_be_bytes(read_array::<8>(reader)?))
}

/// Reads a length-prefixed UTF-8 string; a `-1` length yields `None`.
pub fn read_string(reader: &mut impl Read) -> Result<Option<String>, ProtocolError> {
    match read_bytes(reader)? {
        Some(data) => {
            let s = String::from_utf8(data).map_err(|_| ProtocolError::InvalidUtf8)?;
            Ok(Some(s))
        }
        None => Ok(None),
    }
}

/// Reads a length-prefixed blob; a `-1` length yields `None`.
pub fn read_bytes(reader: &mut impl Read) -> Result<Option<Vec<u8>>, ProtocolError> {
    let len = read_i32(reader)?;
    if len == -1 {
        return Ok(None);
    }
    if len < 0 {
        return Err(ProtocolError::InvalidLength(len));
    }
    let mut data = vec![0u8; len as usize];
    reader
        .read_exact(&mut data)
        .map_err(|e| ProtocolError::from_read(e, len as usize))?;
    Ok(Some(data))
}

/// Reads `count` length-prefixed strings. The count is never on the wire;
/// the operation supplies it. Null entries decode as empty strings.
pub fn decode_strings(reader: &mut impl Read, count: usize) -> Result<Vec<String>, ProtocolError> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(read_string(reader)?.unwrap_or_default());
    }
    Ok(out)
}

fn read_array<const N: usize>(reader: &mut impl Read) -> Result<[u8; N], ProtocolError> {
    let mut buf = [0u8; N];
    reader
        .read_exact(&mut buf)
        .map_err(|e| ProtocolError::from_read(e, N))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn encode_one(field: &Field) -> Vec<u8> {
        let mut buf = BytesMut::new();
        field.encode(&mut buf);
        buf.to_vec()
    }

    fn round_trip(field: Field, tag: FieldTag) -> Field {
        let encoded = encode_one(&field);
        let mut reader: &[u8] = &encoded;
        decode(tag, &mut reader).unwrap()
    }

    #[test]
    fn test_integer_layouts() {
        assert_eq!(encode_one(&Field::Byte(7)), vec![7]);
        assert_eq!(encode_one(&Field::Short(-1)), vec![0xFF, 0xFF]);
        assert_eq!(encode_one(&Field::Int(1)), vec![0, 0, 0, 1]);
        assert_eq!(
            encode_one(&Field::Long(1)),
            vec![0, 0, 0, 0, 0, 0, 0, 1]
        );
        assert_eq!(encode_one(&Field::Boolean(true)), vec![1]);
        assert_eq!(encode_one(&Field::Boolean(false)), vec![0]);
    }

    #[test]
    fn test_string_layout() {
        assert_eq!(
            encode_one(&Field::string("db")),
            vec![0, 0, 0, 2, b'd', b'b']
        );
        // empty and null are distinct on the wire
        assert_eq!(encode_one(&Field::String(Some(String::new()))), vec![0; 4]);
        assert_eq!(
            encode_one(&Field::String(None)),
            vec![0xFF, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn test_strings_concatenation_has_no_count() {
        let field = Field::Strings(vec!["a".to_string(), "bc".to_string()]);
        assert_eq!(
            encode_one(&field),
            vec![0, 0, 0, 1, b'a', 0, 0, 0, 2, b'b', b'c']
        );
    }

    #[test]
    fn test_round_trips() {
        assert_eq!(round_trip(Field::Byte(0xFE), FieldTag::Byte), Field::Byte(0xFE));
        assert_eq!(
            round_trip(Field::Short(-32768), FieldTag::Short),
            Field::Short(-32768)
        );
        assert_eq!(round_trip(Field::Int(-1), FieldTag::Int), Field::Int(-1));
        assert_eq!(
            round_trip(Field::Long(i64::MAX), FieldTag::Long),
            Field::Long(i64::MAX)
        );
        assert_eq!(
            round_trip(Field::Boolean(true), FieldTag::Boolean),
            Field::Boolean(true)
        );
        assert_eq!(
            round_trip(Field::String(None), FieldTag::String),
            Field::String(None)
        );
        assert_eq!(
            round_trip(Field::String(Some(String::new())), FieldTag::String),
            Field::String(Some(String::new()))
        );
        assert_eq!(
            round_trip(Field::Bytes(Some(vec![0; 1024 * 64])), FieldTag::Bytes),
            Field::Bytes(Some(vec![0; 1024 * 64]))
        );
        assert_eq!(
            round_trip(Field::Bytes(None), FieldTag::Bytes),
            Field::Bytes(None)
        );
    }

    #[test]
    fn test_boolean_decodes_any_nonzero() {
        let mut reader: &[u8] = &[42];
        assert_eq!(
            decode(FieldTag::Boolean, &mut reader).unwrap(),
            Field::Boolean(true)
        );
    }

    #[test]
    fn test_truncated_stream_is_a_framing_error() {
        // declared 4-byte length but only 2 bytes of payload follow
        let mut reader: &[u8] = &[0, 0, 0, 4, b'a', b'b'];
        assert!(matches!(
            read_string(&mut reader),
            Err(ProtocolError::UnexpectedEof { needed: 4 })
        ));

        let mut reader: &[u8] = &[0, 0];
        assert!(matches!(
            read_i32(&mut reader),
            Err(ProtocolError::UnexpectedEof { needed: 4 })
        ));
    }

    #[test]
    fn test_negative_length_other_than_null_is_rejected() {
        let prefix = (-2i32).to_be_bytes();
        let mut reader: &[u8] = &prefix;
        assert!(matches!(
            read_bytes(&mut reader),
            Err(ProtocolError::InvalidLength(-2))
        ));
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let mut reader: &[u8] = &[0, 0, 0, 2, 0xC3, 0x28];
        assert!(matches!(
            read_string(&mut reader),
            Err(ProtocolError::InvalidUtf8)
        ));
    }

    #[test]
    fn test_decode_strings_takes_count_out_of_band() {
        let mut buf = BytesMut::new();
        Field::Strings(vec!["admin".to_string(), "secret".to_string()]).encode(&mut buf);
        Field::Short(99).encode(&mut buf); // trailing data must stay untouched

        let mut reader: &[u8] = &buf;
        let strings = decode_strings(&mut reader, 2).unwrap();
        assert_eq!(strings, vec!["admin".to_string(), "secret".to_string()]);
        assert_eq!(read_i16(&mut reader).unwrap(), 99);
    }

    proptest! {
        #[test]
        fn prop_int_round_trip(v in any::<i32>()) {
            prop_assert_eq!(round_trip(Field::Int(v), FieldTag::Int), Field::Int(v));
        }

        #[test]
        fn prop_short_round_trip(v in any::<i16>()) {
            prop_assert_eq!(round_trip(Field::Short(v), FieldTag::Short), Field::Short(v));
        }

        #[test]
        fn prop_long_round_trip(v in any::<i64>()) {
            prop_assert_eq!(round_trip(Field::Long(v), FieldTag::Long), Field::Long(v));
        }

        #[test]
        fn prop_string_round_trip(s in ".*") {
            prop_assert_eq!(
                round_trip(Field::String(Some(s.clone())), FieldTag::String),
                Field::String(Some(s))
            );
        }

        #[test]
        fn prop_bytes_round_trip(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            prop_assert_eq!(
                round_trip(Field::Bytes(Some(data.clone())), FieldTag::Bytes),
                Field::Bytes(Some(data))
            );
        }
    }
}

//! Flutter's standard method codec, as spoken by `MethodChannel` with
//! `StandardMethodCodec` on the Dart side.
//!
//! Wire format: every value starts with a one-byte type tag. Sizes are one
//! byte below 254, `254` + u16 LE, or `255` + u32 LE. Doubles and the 4/8-byte
//! element lists are padded to their element size, relative to the start of
//! the buffer. A method call is the method-name string followed by the
//! argument value; a response is a success (`0x00`) or error (`0x01`)
//! envelope. A zero-length response means "not implemented".

use std::io::{Cursor, Read};

use anyhow::{bail, ensure, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt};

const TAG_NULL: u8 = 0;
const TAG_TRUE: u8 = 1;
const TAG_FALSE: u8 = 2;
const TAG_INT32: u8 = 3;
const TAG_INT64: u8 = 4;
const TAG_FLOAT64: u8 = 6;
const TAG_STRING: u8 = 7;
const TAG_UINT8_LIST: u8 = 8;
const TAG_INT32_LIST: u8 = 9;
const TAG_INT64_LIST: u8 = 10;
const TAG_FLOAT64_LIST: u8 = 11;
const TAG_LIST: u8 = 12;
const TAG_MAP: u8 = 13;

const ENVELOPE_SUCCESS: u8 = 0;
const ENVELOPE_ERROR: u8 = 1;

/// A value transportable over a standard-codec channel.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodableValue {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F64(f64),
    Str(String),
    U8List(Vec<u8>),
    I32List(Vec<i32>),
    I64List(Vec<i64>),
    F64List(Vec<f64>),
    List(Vec<EncodableValue>),
    Map(Vec<(EncodableValue, EncodableValue)>),
}

/// A decoded inbound method invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method: String,
    pub args: EncodableValue,
}

fn read_size(cur: &mut Cursor<&[u8]>) -> Result<usize> {
    match cur.read_u8().context("truncated size")? {
        254 => Ok(cur.read_u16::<LittleEndian>().context("truncated u16 size")? as usize),
        255 => Ok(cur.read_u32::<LittleEndian>().context("truncated u32 size")? as usize),
        n => Ok(n as usize),
    }
}

fn read_alignment(cur: &mut Cursor<&[u8]>, alignment: u64) -> Result<()> {
    let rem = cur.position() % alignment;
    if rem != 0 {
        for _ in 0..(alignment - rem) {
            cur.read_u8().context("truncated alignment padding")?;
        }
    }
    Ok(())
}

fn read_value(cur: &mut Cursor<&[u8]>) -> Result<EncodableValue> {
    let tag = cur.read_u8().context("truncated value tag")?;
    let value = match tag {
        TAG_NULL => EncodableValue::Null,
        TAG_TRUE => EncodableValue::Bool(true),
        TAG_FALSE => EncodableValue::Bool(false),
        TAG_INT32 => EncodableValue::I32(cur.read_i32::<LittleEndian>().context("truncated i32")?),
        TAG_INT64 => EncodableValue::I64(cur.read_i64::<LittleEndian>().context("truncated i64")?),
        TAG_FLOAT64 => {
            read_alignment(cur, 8)?;
            EncodableValue::F64(cur.read_f64::<LittleEndian>().context("truncated f64")?)
        }
        TAG_STRING => {
            let len = read_size(cur)?;
            let mut buf = vec![0u8; len];
            cur.read_exact(&mut buf).context("truncated string")?;
            EncodableValue::Str(String::from_utf8(buf).context("string is not UTF-8")?)
        }
        TAG_UINT8_LIST => {
            let len = read_size(cur)?;
            let mut buf = vec![0u8; len];
            cur.read_exact(&mut buf).context("truncated byte list")?;
            EncodableValue::U8List(buf)
        }
        TAG_INT32_LIST => {
            let len = read_size(cur)?;
            read_alignment(cur, 4)?;
            let mut out = Vec::with_capacity(len);
            for _ in 0..len {
                out.push(cur.read_i32::<LittleEndian>().context("truncated i32 list")?);
            }
            EncodableValue::I32List(out)
        }
        TAG_INT64_LIST => {
            let len = read_size(cur)?;
            read_alignment(cur, 8)?;
            let mut out = Vec::with_capacity(len);
            for _ in 0..len {
                out.push(cur.read_i64::<LittleEndian>().context("truncated i64 list")?);
            }
            EncodableValue::I64List(out)
        }
        TAG_FLOAT64_LIST => {
            let len = read_size(cur)?;
            read_alignment(cur, 8)?;
            let mut out = Vec::with_capacity(len);
            for _ in 0..len {
                out.push(cur.read_f64::<LittleEndian>().context("truncated f64 list")?);
            }
            EncodableValue::F64List(out)
        }
        TAG_LIST => {
            let len = read_size(cur)?;
            let mut out = Vec::with_capacity(len);
            for _ in 0..len {
                out.push(read_value(cur)?);
            }
            EncodableValue::List(out)
        }
        TAG_MAP => {
            let len = read_size(cur)?;
            let mut out = Vec::with_capacity(len);
            for _ in 0..len {
                let key = read_value(cur)?;
                let val = read_value(cur)?;
                out.push((key, val));
            }
            EncodableValue::Map(out)
        }
        other => bail!("unknown standard codec tag {other}"),
    };
    Ok(value)
}

fn write_size(buf: &mut Vec<u8>, size: usize) {
    if size < 254 {
        buf.push(size as u8);
    } else if size <= u16::MAX as usize {
        buf.push(254);
        buf.extend_from_slice(&(size as u16).to_le_bytes());
    } else {
        buf.push(255);
        buf.extend_from_slice(&(size as u32).to_le_bytes());
    }
}

fn write_alignment(buf: &mut Vec<u8>, alignment: usize) {
    while buf.len() % alignment != 0 {
        buf.push(0);
    }
}

fn write_value(buf: &mut Vec<u8>, value: &EncodableValue) {
    match value {
        EncodableValue::Null => buf.push(TAG_NULL),
        EncodableValue::Bool(true) => buf.push(TAG_TRUE),
        EncodableValue::Bool(false) => buf.push(TAG_FALSE),
        EncodableValue::I32(v) => {
            buf.push(TAG_INT32);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        EncodableValue::I64(v) => {
            buf.push(TAG_INT64);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        EncodableValue::F64(v) => {
            buf.push(TAG_FLOAT64);
            write_alignment(buf, 8);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        EncodableValue::Str(s) => {
            buf.push(TAG_STRING);
            write_size(buf, s.len());
            buf.extend_from_slice(s.as_bytes());
        }
        EncodableValue::U8List(v) => {
            buf.push(TAG_UINT8_LIST);
            write_size(buf, v.len());
            buf.extend_from_slice(v);
        }
        EncodableValue::I32List(v) => {
            buf.push(TAG_INT32_LIST);
            write_size(buf, v.len());
            write_alignment(buf, 4);
            for x in v {
                buf.extend_from_slice(&x.to_le_bytes());
            }
        }
        EncodableValue::I64List(v) => {
            buf.push(TAG_INT64_LIST);
            write_size(buf, v.len());
            write_alignment(buf, 8);
            for x in v {
                buf.extend_from_slice(&x.to_le_bytes());
            }
        }
        EncodableValue::F64List(v) => {
            buf.push(TAG_FLOAT64_LIST);
            write_size(buf, v.len());
            write_alignment(buf, 8);
            for x in v {
                buf.extend_from_slice(&x.to_le_bytes());
            }
        }
        EncodableValue::List(items) => {
            buf.push(TAG_LIST);
            write_size(buf, items.len());
            for item in items {
                write_value(buf, item);
            }
        }
        EncodableValue::Map(pairs) => {
            buf.push(TAG_MAP);
            write_size(buf, pairs.len());
            for (key, val) in pairs {
                write_value(buf, key);
                write_value(buf, val);
            }
        }
    }
}

/// Decodes one inbound method call.
pub fn decode_method_call(bytes: &[u8]) -> Result<MethodCall> {
    let mut cur = Cursor::new(bytes);
    let method = match read_value(&mut cur)? {
        EncodableValue::Str(s) => s,
        other => bail!("method name is not a string: {other:?}"),
    };
    let args = read_value(&mut cur)?;
    ensure!(
        cur.position() as usize == bytes.len(),
        "trailing bytes after method call"
    );
    Ok(MethodCall { method, args })
}

/// Encodes an outbound method call (the mirror of [`decode_method_call`]).
pub fn encode_method_call(method: &str, args: &EncodableValue) -> Vec<u8> {
    let mut buf = Vec::new();
    write_value(&mut buf, &EncodableValue::Str(method.to_string()));
    write_value(&mut buf, args);
    buf
}

/// Encodes a success response envelope.
pub fn encode_success_envelope(result: &EncodableValue) -> Vec<u8> {
    let mut buf = vec![ENVELOPE_SUCCESS];
    write_value(&mut buf, result);
    buf
}

/// Encodes an error response envelope.
pub fn encode_error_envelope(
    code: &str,
    message: Option<&str>,
    details: &EncodableValue,
) -> Vec<u8> {
    let mut buf = vec![ENVELOPE_ERROR];
    write_value(&mut buf, &EncodableValue::Str(code.to_string()));
    match message {
        Some(m) => write_value(&mut buf, &EncodableValue::Str(m.to_string())),
        None => write_value(&mut buf, &EncodableValue::Null),
    }
    write_value(&mut buf, details);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_pass_through_call() {
        // [string "setMousePassThrough"][true]
        let mut bytes = vec![TAG_STRING, 19];
        bytes.extend_from_slice(b"setMousePassThrough");
        bytes.push(TAG_TRUE);

        let call = decode_method_call(&bytes).unwrap();
        assert_eq!(call.method, "setMousePassThrough");
        assert_eq!(call.args, EncodableValue::Bool(true));
    }

    #[test]
    fn decodes_opacity_call_with_double_alignment() {
        // "setWindowOpacity" is 16 bytes, so the f64 tag lands at offset 18
        // and the payload must be padded out to offset 24.
        let mut bytes = vec![TAG_STRING, 16];
        bytes.extend_from_slice(b"setWindowOpacity");
        bytes.push(TAG_FLOAT64);
        bytes.extend_from_slice(&[0u8; 5]);
        bytes.extend_from_slice(&0.5f64.to_le_bytes());

        let call = decode_method_call(&bytes).unwrap();
        assert_eq!(call.method, "setWindowOpacity");
        assert_eq!(call.args, EncodableValue::F64(0.5));

        // The encoder must produce the identical layout.
        assert_eq!(
            encode_method_call("setWindowOpacity", &EncodableValue::F64(0.5)),
            bytes
        );
    }

    #[test]
    fn long_strings_use_extended_size_prefix() {
        let s = "x".repeat(300);
        let encoded = encode_method_call(&s, &EncodableValue::Null);
        // 300 = 0x012C, little endian after the 254 marker.
        assert_eq!(&encoded[..4], &[TAG_STRING, 254, 0x2C, 0x01]);
    }

    #[test]
    fn success_envelope_wraps_result() {
        assert_eq!(
            encode_success_envelope(&EncodableValue::Bool(true)),
            vec![ENVELOPE_SUCCESS, TAG_TRUE]
        );
    }

    #[test]
    fn error_envelope_carries_code_message_details() {
        let bytes = encode_error_envelope("INVALID_ARGUMENT", Some("Expected boolean argument"), &EncodableValue::Null);
        let mut expected = vec![ENVELOPE_ERROR, TAG_STRING, 16];
        expected.extend_from_slice(b"INVALID_ARGUMENT");
        expected.push(TAG_STRING);
        expected.push(25);
        expected.extend_from_slice(b"Expected boolean argument");
        expected.push(TAG_NULL);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn decodes_nested_map_argument() {
        // {"enabled": true} as a method argument
        let mut bytes = vec![TAG_STRING, 3];
        bytes.extend_from_slice(b"foo");
        bytes.push(TAG_MAP);
        bytes.push(1);
        bytes.push(TAG_STRING);
        bytes.push(7);
        bytes.extend_from_slice(b"enabled");
        bytes.push(TAG_TRUE);

        let call = decode_method_call(&bytes).unwrap();
        assert_eq!(
            call.args,
            EncodableValue::Map(vec![(
                EncodableValue::Str("enabled".into()),
                EncodableValue::Bool(true)
            )])
        );
    }

    #[test]
    fn rejects_truncated_input() {
        assert!(decode_method_call(&[TAG_STRING, 5, b'a']).is_err());
        assert!(decode_method_call(&[]).is_err());
    }

    #[test]
    fn rejects_unknown_tag() {
        let mut bytes = vec![TAG_STRING, 3];
        bytes.extend_from_slice(b"foo");
        bytes.push(200);
        assert!(decode_method_call(&bytes).is_err());
    }

    #[test]
    fn rejects_non_string_method_name() {
        assert!(decode_method_call(&[TAG_INT32, 1, 0, 0, 0, TAG_NULL]).is_err());
    }
}

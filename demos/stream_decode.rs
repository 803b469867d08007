// ABOUTME: Decodes a stream of concatenated MessagePack messages arriving in small chunks.
// ABOUTME: Run with: RUST_LOG=msgpack_vo=trace cargo run --example stream_decode -- [chunk_size]

use msgpack_vo::{flagged_fields, Decoder, Error, Result, Value, ValueObject, VoHelper, VoInstance};
use std::sync::Arc;
use tracing::info;

struct Point {
    x: i64,
    y: i64,
}

struct Timestamp(u64);

const POINT_TYPE: u16 = 1;
const TIMESTAMP_TYPE: u8 = 0x10;

/// Builds `Point` records (type 1, fields x and y) and 8-byte timestamps (custom type 0x10).
struct DemoHelper;

#[derive(Default)]
struct DemoInstance {
    type_id: Option<u16>,
    pending: u32,
    mixins: u32,
    fields: Vec<i64>,
    timestamp: Option<u64>,
}

impl VoHelper for DemoHelper {
    fn create_instance(&self) -> Box<dyn VoInstance> {
        Box::new(DemoInstance::default())
    }
}

impl VoInstance for DemoInstance {
    fn process_value_type(&mut self, type_id: u8) -> Result<usize> {
        match type_id {
            TIMESTAMP_TYPE => Ok(8),
            other => Err(Error::vo_helper(format!("unknown value type 0x{other:02x}"))),
        }
    }

    fn accept_raw(&mut self, bytes: &[u8]) -> Result<()> {
        let bytes: [u8; 8] = bytes
            .try_into()
            .map_err(|_| Error::vo_helper("timestamp must be 8 bytes"))?;
        self.timestamp = Some(u64::from_be_bytes(bytes));
        Ok(())
    }

    fn prepare_for_type(&mut self, type_id: u16) -> Result<()> {
        if type_id != POINT_TYPE {
            return Err(Error::vo_helper(format!("unknown type {type_id}")));
        }
        self.type_id = Some(type_id);
        Ok(())
    }

    fn prepare_field_group(&mut self, flags: u8) -> Result<()> {
        self.pending = flagged_fields(flags);
        Ok(())
    }

    fn accept_value(&mut self, value: Value) -> Result<()> {
        self.pending = self.pending.saturating_sub(1);
        let n = value
            .as_i64()
            .ok_or_else(|| Error::vo_helper("point fields must be integers"))?;
        self.fields.push(n);
        Ok(())
    }

    fn has_pending_values_in_group(&self) -> bool {
        self.pending > 0
    }

    fn add_mixins(&mut self, count: u32) {
        self.mixins += count;
    }

    fn has_pending_mixins(&self) -> bool {
        self.mixins > 0
    }

    fn consume_one_mixin(&mut self) {
        self.mixins -= 1;
    }

    fn finalize(self: Box<Self>) -> Result<Value> {
        if let Some(ts) = self.timestamp {
            return Ok(Value::ValueObject(ValueObject::new(Timestamp(ts))));
        }
        match (self.type_id, self.fields.as_slice()) {
            (Some(POINT_TYPE), [x, y]) => Ok(Value::ValueObject(ValueObject::new(Point { x: *x, y: *y }))),
            _ => Err(Error::vo_helper("incomplete point")),
        }
    }
}

fn sample_stream() -> Vec<u8> {
    let mut stream = Vec::new();
    // {"name": "demo", "tags": ["a", "b"]}
    stream.extend_from_slice(&[
        0x82, 0xa4, b'n', b'a', b'm', b'e', 0xa4, b'd', b'e', b'm', b'o', 0xa4, b't', b'a', b'g',
        b's', 0x92, 0xa1, b'a', 0xa1, b'b',
    ]);
    // Point { x: 3, y: -4 }
    stream.extend_from_slice(&[0xd7, 0x81, 0x01, 0x03, 0x03, 0xfc]);
    // [timestamp, 1.5f32, 2^63]
    stream.extend_from_slice(&[0x93, 0xd7, TIMESTAMP_TYPE]);
    stream.extend_from_slice(&1_700_000_000_000u64.to_be_bytes());
    stream.extend_from_slice(&[0xca, 0x3f, 0xc0, 0x00, 0x00]);
    stream.extend_from_slice(&[0xcf, 0x80, 0, 0, 0, 0, 0, 0, 0]);
    stream
}

fn describe(value: &Value) -> String {
    match value {
        Value::ValueObject(vo) => {
            if let Some(point) = vo.downcast_ref::<Point>() {
                format!("Point(x: {}, y: {})", point.x, point.y)
            } else if let Some(ts) = vo.downcast_ref::<Timestamp>() {
                format!("Timestamp({} ms)", ts.0)
            } else {
                value.to_string()
            }
        }
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(describe).collect();
            format!("[{}]", parts.join(", "))
        }
        _ => value.to_string(),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stream_decode=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let chunk_size = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(3);

    let stream = sample_stream();
    info!(bytes = stream.len(), chunk_size, "decoding sample stream");

    let mut decoder = Decoder::new().with_vo_helper(Arc::new(DemoHelper));
    let mut pending: Vec<u8> = Vec::new();
    let mut messages = 0;

    for chunk in stream.chunks(chunk_size) {
        pending.extend_from_slice(chunk);
        // One chunk may complete several messages
        loop {
            let consumed = match decoder.advance(&pending, 0, pending.len()) {
                Ok(consumed) => consumed,
                Err(err) => {
                    eprintln!("error: {err}");
                    std::process::exit(1);
                }
            };
            pending.drain(..consumed);
            let Some(value) = decoder.take_result() else {
                break;
            };
            messages += 1;
            println!("message {messages}: {}", describe(&value));
            decoder.reset();
        }
    }

    if !pending.is_empty() || decoder.has_partial_message() {
        eprintln!("error: stream ended inside a message");
        std::process::exit(1);
    }
    info!(messages, "done");
}

// ABOUTME: Resumable streaming MessagePack decoder with Value-Object support.
// ABOUTME: An explicit frame stack replaces recursion so decoding can pause at any byte boundary.

#![allow(clippy::missing_errors_doc)]

use crate::error::{Error, Result};
use crate::types::{limits, type_code, vo_header};
use crate::value::Value;
use crate::vo::{VoHelper, VoInstance};
use num_bigint::BigUint;
use std::sync::Arc;
use tracing::{debug, trace};

/// Configuration options for the decoder.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Maximum container nesting depth, Value-Objects included (default: 32)
    pub max_depth: usize,
    /// Maximum raw length in bytes, also applied to custom value types
    pub max_raw_length: usize,
    /// Maximum elements (arrays) or pairs (maps) in a container
    pub max_container_size: usize,
    /// Allow bytes after the message in [`Decoder::decode`] (default: false)
    pub allow_trailing_bytes: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_depth: limits::MAX_DEPTH,
            max_raw_length: limits::MAX_RAW_LENGTH,
            max_container_size: limits::MAX_CONTAINER_SIZE,
            allow_trailing_bytes: false,
        }
    }
}

/// A fixed-width scalar whose payload is being awaited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar {
    Float32,
    Float64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
}

impl Scalar {
    fn from_type_code(code: u8) -> Option<Self> {
        Some(match code {
            type_code::FLOAT32 => Scalar::Float32,
            type_code::FLOAT64 => Scalar::Float64,
            type_code::UINT8 => Scalar::UInt8,
            type_code::UINT16 => Scalar::UInt16,
            type_code::UINT32 => Scalar::UInt32,
            type_code::UINT64 => Scalar::UInt64,
            type_code::INT8 => Scalar::Int8,
            type_code::INT16 => Scalar::Int16,
            type_code::INT32 => Scalar::Int32,
            type_code::INT64 => Scalar::Int64,
            _ => return None,
        })
    }

    /// Decode the big-endian payload. `bytes` holds exactly the scalar's width.
    fn decode(self, bytes: &[u8]) -> Value {
        match self {
            Scalar::Float32 => Value::Float32(f32::from_be_bytes(be(bytes))),
            Scalar::Float64 => Value::Float64(f64::from_be_bytes(be(bytes))),
            Scalar::UInt8 => Value::Int(i64::from(bytes[0])),
            Scalar::UInt16 => Value::Int(i64::from(u16::from_be_bytes(be(bytes)))),
            Scalar::UInt32 => Value::Int(i64::from(u32::from_be_bytes(be(bytes)))),
            Scalar::UInt64 => {
                let n = u64::from_be_bytes(be(bytes));
                match i64::try_from(n) {
                    Ok(n) => Value::Int(n),
                    // Top bit set: keep the unsigned magnitude
                    Err(_) => Value::BigInt(BigUint::from_bytes_be(bytes)),
                }
            }
            Scalar::Int8 => Value::Int(i64::from(i8::from_be_bytes(be(bytes)))),
            Scalar::Int16 => Value::Int(i64::from(i16::from_be_bytes(be(bytes)))),
            Scalar::Int32 => Value::Int(i64::from(i32::from_be_bytes(be(bytes)))),
            Scalar::Int64 => Value::Int(i64::from_be_bytes(be(bytes))),
        }
    }
}

/// The item a 16/32-bit length prefix belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prefixed {
    Raw,
    Array,
    Map,
}

impl Prefixed {
    fn from_type_code(code: u8) -> Option<Self> {
        match code {
            type_code::RAW16 | type_code::RAW32 => Some(Prefixed::Raw),
            type_code::ARRAY16 | type_code::ARRAY32 => Some(Prefixed::Array),
            type_code::MAP16 | type_code::MAP32 => Some(Prefixed::Map),
            _ => None,
        }
    }
}

/// What the decoder is waiting for.
///
/// `Header` reads one type code at a time; every other state waits for
/// exactly `trail` bytes and handles them in one go.
///
/// ```text
///   Header ──> Scalar | Length ──> RawBody
///     │
///     └─ 0xd7 ──> VoHeader ──> VoTypeId ──> VoFields ──> Header (field values)
///                    │  ^                       │ ^            │
///                    │  └──── next mixin ───────┴─┼────────────┘
///                    └─> VoCustom                 └── next field group
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header,
    Scalar(Scalar),
    Length(Prefixed),
    RawBody,
    VoHeader,
    VoTypeId { header: u8 },
    VoCustom,
    VoFields,
}

/// A container whose decoding is paused while its children are decoded.
///
/// The slot the next child fills follows from the variant: array item, map key
/// (`key` empty), map value (`key` held), or Value-Object field value.
enum Frame {
    Array {
        items: Vec<Value>,
        remaining: usize,
    },
    Map {
        pairs: Vec<(Value, Value)>,
        key: Option<Value>,
        remaining: usize,
    },
    ValueObject {
        instance: Box<dyn VoInstance>,
        /// Field groups left in the current header block
        groups: u8,
    },
}

/// Result of handling one type code or one trail.
enum Step {
    /// A complete value, to be stored in the current frame
    Emit(Value),
    /// The decoder moved to a new state and needs more input
    Await,
}

/// A resumable MessagePack decoder.
///
/// Feed it byte slices with [`advance`](Self::advance); it consumes as much as it
/// can and returns the offset of the first unconsumed byte. When a whole
/// message has been decoded, [`is_finished`](Self::is_finished) turns true and
/// the value can be taken with [`take_result`](Self::take_result). Call
/// [`reset`](Self::reset) before decoding the next message.
///
/// ```rust
/// use msgpack_vo::{Decoder, Value};
///
/// let message = [0x92, 0x01, 0xa2, b'h', b'i']; // [1, "hi"]
/// let mut decoder = Decoder::new();
///
/// // The first chunk ends inside the raw value
/// let consumed = decoder.advance(&message[..3], 0, 3).unwrap();
/// assert_eq!(consumed, 3);
/// assert!(!decoder.is_finished());
///
/// let consumed = decoder.advance(&message, consumed, message.len()).unwrap();
/// assert_eq!(consumed, message.len());
/// assert_eq!(decoder.take_result(), Some(Value::from(vec![Value::Int(1), Value::from("hi")])));
/// ```
pub struct Decoder {
    config: DecoderConfig,
    helper: Option<Arc<dyn VoHelper>>,
    state: State,
    /// Bytes required before the current state can be handled
    trail: usize,
    /// Paused containers; the last entry is the one being filled
    stack: Vec<Frame>,
    finished: bool,
    result: Option<Value>,
    poisoned: bool,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    /// Create a new decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    /// Create a new decoder with custom configuration.
    #[must_use]
    pub fn with_config(config: DecoderConfig) -> Self {
        let stack = Vec::with_capacity(config.max_depth.min(limits::MAX_DEPTH));
        Self {
            config,
            helper: None,
            state: State::Header,
            trail: 0,
            stack,
            finished: false,
            result: None,
            poisoned: false,
        }
    }

    /// Register the helper that builds Value-Objects (builder style).
    #[must_use]
    pub fn with_vo_helper(mut self, helper: Arc<dyn VoHelper>) -> Self {
        self.helper = Some(helper);
        self
    }

    /// Register the helper that builds Value-Objects.
    pub fn set_vo_helper(&mut self, helper: Arc<dyn VoHelper>) {
        self.helper = Some(helper);
    }

    /// Get the decoder configuration.
    #[must_use]
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Whether a whole message has been decoded since the last reset.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The decoded message, if finished and not yet taken.
    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Take the decoded message. The decoder stays finished until reset.
    pub fn take_result(&mut self) -> Option<Value> {
        self.result.take()
    }

    /// Number of containers currently open.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Whether some of a message has been consumed but it is not finished yet.
    #[must_use]
    pub fn has_partial_message(&self) -> bool {
        !self.finished && (self.state != State::Header || !self.stack.is_empty())
    }

    /// Clear all decoding state to start a new message.
    ///
    /// The frame stack keeps its allocation and the Value-Object helper stays registered.
    pub fn reset(&mut self) {
        self.state = State::Header;
        self.trail = 0;
        self.stack.clear();
        self.finished = false;
        self.result = None;
        self.poisoned = false;
    }

    /// Decode `buf[offset..limit]` as far as possible.
    ///
    /// Returns the offset of the first byte not consumed. Once the message is
    /// finished no further bytes are consumed. Bytes before the returned offset
    /// have been fully processed and are never needed again, so the next call
    /// passes the unconsumed remainder followed by newly received data.
    /// The returned offset never exceeds `limit`; an `offset` past `limit`
    /// is treated as an empty window.
    ///
    /// Any error is terminal for the message: until [`reset`](Self::reset) is
    /// called, further calls fail with [`Error::Poisoned`].
    pub fn advance(&mut self, buf: &[u8], offset: usize, limit: usize) -> Result<usize> {
        if self.poisoned {
            return Err(Error::Poisoned);
        }
        let limit = limit.min(buf.len());
        let offset = offset.min(limit);
        match self.run(buf, offset, limit) {
            Ok(pos) => Ok(pos),
            Err(err) => {
                debug!(error = %err, depth = self.stack.len(), "format error, decoder needs reset");
                self.poisoned = true;
                Err(err)
            }
        }
    }

    /// Decode exactly one complete message from `data`, starting from a fresh state.
    ///
    /// Fails with [`Error::Truncated`] if the message is incomplete and with
    /// [`Error::TrailingBytes`] if bytes remain (unless allowed by the config).
    pub fn decode(&mut self, data: &[u8]) -> Result<Value> {
        self.reset();
        let consumed = self.advance(data, 0, data.len())?;
        let value = self.take_result().ok_or(Error::Truncated)?;
        if !self.config.allow_trailing_bytes && consumed < data.len() {
            return Err(Error::TrailingBytes);
        }
        Ok(value)
    }

    fn run(&mut self, buf: &[u8], mut pos: usize, limit: usize) -> Result<usize> {
        while !self.finished {
            let step = if self.state == State::Header {
                if pos >= limit {
                    break;
                }
                let code = buf[pos];
                pos += 1;
                self.dispatch(code)?
            } else {
                if limit.saturating_sub(pos) < self.trail {
                    break;
                }
                let end = pos + self.trail;
                let step = self.complete(&buf[pos..end])?;
                pos = end;
                step
            };
            if let Step::Emit(value) = step {
                self.push_value(value)?;
            }
        }
        Ok(pos)
    }

    /// Wait for `trail` bytes in `state`.
    fn expect(&mut self, state: State, trail: usize) {
        self.state = state;
        self.trail = trail;
    }

    /// Wait for the next type code.
    fn expect_header(&mut self) {
        self.expect(State::Header, 0);
    }

    /// Classify a type code.
    fn dispatch(&mut self, code: u8) -> Result<Step> {
        if type_code::is_positive_fixint(code) || type_code::is_negative_fixint(code) {
            return Ok(Step::Emit(Value::Int(type_code::fixint_value(code))));
        }
        if type_code::is_fixraw(code) {
            return self.begin_raw(type_code::fixraw_len(code));
        }
        if type_code::is_fixarray(code) {
            return self.begin_array(type_code::fix_container_len(code));
        }
        if type_code::is_fixmap(code) {
            return self.begin_map(type_code::fix_container_len(code));
        }

        match code {
            type_code::NIL => Ok(Step::Emit(Value::Nil)),
            type_code::FALSE => Ok(Step::Emit(Value::Bool(false))),
            type_code::TRUE => Ok(Step::Emit(Value::Bool(true))),
            type_code::VALUE_OBJECT => self.begin_value_object(),
            _ => {
                if let Some(scalar) = Scalar::from_type_code(code) {
                    self.expect(State::Scalar(scalar), type_code::fixed_scalar_width(code));
                    return Ok(Step::Await);
                }
                if let Some(prefixed) = Prefixed::from_type_code(code) {
                    self.expect(State::Length(prefixed), type_code::length_prefix_width(code));
                    return Ok(Step::Await);
                }
                Err(Error::InvalidTypeCode(code))
            }
        }
    }

    /// Handle the `trail` bytes awaited by the current state.
    fn complete(&mut self, bytes: &[u8]) -> Result<Step> {
        match self.state {
            State::Header => Err(Error::InvalidState),
            State::Scalar(scalar) => Ok(Step::Emit(scalar.decode(bytes))),
            State::Length(prefixed) => {
                let len = read_length(bytes)?;
                match prefixed {
                    Prefixed::Raw => self.begin_raw(len),
                    Prefixed::Array => self.begin_array(len),
                    Prefixed::Map => self.begin_map(len),
                }
            }
            State::RawBody => Ok(Step::Emit(Value::Raw(bytes.to_vec()))),
            State::VoHeader => self.vo_header(bytes[0]),
            State::VoTypeId { header } => self.vo_type_id(header, bytes),
            State::VoCustom => self.vo_custom(bytes),
            State::VoFields => self.vo_fields(bytes[0]),
        }
    }

    fn begin_raw(&mut self, len: usize) -> Result<Step> {
        if len > self.config.max_raw_length {
            return Err(Error::MaxRawLengthExceeded(len));
        }
        if len == 0 {
            return Ok(Step::Emit(Value::Raw(Vec::new())));
        }
        self.expect(State::RawBody, len);
        Ok(Step::Await)
    }

    fn begin_array(&mut self, count: usize) -> Result<Step> {
        if count > self.config.max_container_size {
            return Err(Error::MaxContainerSizeExceeded(count));
        }
        if count == 0 {
            return Ok(Step::Emit(Value::Array(Vec::new())));
        }
        self.push_frame(Frame::Array {
            items: Vec::with_capacity(count.min(limits::MAX_PREALLOCATION)),
            remaining: count,
        })?;
        self.expect_header();
        Ok(Step::Await)
    }

    fn begin_map(&mut self, count: usize) -> Result<Step> {
        if count > self.config.max_container_size {
            return Err(Error::MaxContainerSizeExceeded(count));
        }
        if count == 0 {
            return Ok(Step::Emit(Value::Map(Vec::new())));
        }
        self.push_frame(Frame::Map {
            pairs: Vec::with_capacity(count.min(limits::MAX_PREALLOCATION)),
            key: None,
            remaining: count,
        })?;
        self.expect_header();
        Ok(Step::Await)
    }

    fn begin_value_object(&mut self) -> Result<Step> {
        let instance = self
            .helper
            .as_ref()
            .ok_or(Error::MissingVoHelper)?
            .create_instance();
        self.push_frame(Frame::ValueObject { instance, groups: 0 })?;
        self.expect(State::VoHeader, 1);
        Ok(Step::Await)
    }

    fn push_frame(&mut self, frame: Frame) -> Result<()> {
        if self.stack.len() >= self.config.max_depth {
            return Err(Error::MaxDepthExceeded(self.config.max_depth));
        }
        self.stack.push(frame);
        trace!(depth = self.stack.len(), "push frame");
        Ok(())
    }

    /// Store a completed value in the current frame, closing frames upward as they fill.
    fn push_value(&mut self, mut value: Value) -> Result<()> {
        loop {
            let Some(frame) = self.stack.last_mut() else {
                trace!("message complete");
                self.result = Some(value);
                self.finished = true;
                self.expect_header();
                return Ok(());
            };

            let filled = match frame {
                Frame::Array { items, remaining } => {
                    items.push(value);
                    *remaining -= 1;
                    *remaining == 0
                }
                Frame::Map {
                    pairs,
                    key,
                    remaining,
                } => match key.take() {
                    None => {
                        *key = Some(value);
                        false
                    }
                    Some(k) => {
                        pairs.push((k, value));
                        *remaining -= 1;
                        *remaining == 0
                    }
                },
                Frame::ValueObject { instance, groups } => {
                    instance.accept_value(value)?;
                    if instance.has_pending_values_in_group() {
                        self.expect_header();
                        return Ok(());
                    }
                    *groups = groups.saturating_sub(1);
                    if *groups > 0 {
                        self.expect(State::VoFields, 1);
                        return Ok(());
                    }
                    match self.vo_next_block()? {
                        Step::Emit(finished) => {
                            value = finished;
                            continue;
                        }
                        Step::Await => return Ok(()),
                    }
                }
            };

            if !filled {
                self.expect_header();
                return Ok(());
            }
            value = match self.stack.pop() {
                Some(Frame::Array { items, .. }) => Value::Array(items),
                Some(Frame::Map { pairs, .. }) => Value::Map(pairs),
                _ => return Err(Error::InvalidState),
            };
            trace!(depth = self.stack.len(), "pop frame");
        }
    }

    // =========================================================================
    // Value-Object sub-protocol
    // =========================================================================

    fn vo_frame(&mut self) -> Result<(&mut dyn VoInstance, &mut u8)> {
        match self.stack.last_mut() {
            Some(Frame::ValueObject { instance, groups }) => Ok((instance.as_mut(), groups)),
            _ => Err(Error::InvalidState),
        }
    }

    fn vo_header(&mut self, header: u8) -> Result<Step> {
        if vo_header::is_structured(header) {
            self.expect(State::VoTypeId { header }, vo_header::type_id_width(header));
            return Ok(Step::Await);
        }

        // Custom value type: the header is the type ID, the helper knows the size
        let max_raw_length = self.config.max_raw_length;
        let (instance, _) = self.vo_frame()?;
        let len = instance.process_value_type(header)?;
        trace!(type_id = header, len, "value-object: custom value type");
        if len > max_raw_length {
            return Err(Error::MaxRawLengthExceeded(len));
        }
        if len == 0 {
            instance.accept_raw(&[])?;
            return self.finish_value_object();
        }
        self.expect(State::VoCustom, len);
        Ok(Step::Await)
    }

    fn vo_type_id(&mut self, header: u8, bytes: &[u8]) -> Result<Step> {
        let type_id = match bytes {
            [id] => u16::from(*id),
            _ => u16::from_be_bytes(be(bytes)),
        };
        let group_count = vo_header::group_count(header);
        let mixins = vo_header::mixin_count(header);
        trace!(type_id, groups = group_count, mixins, "value-object: header block");

        let (instance, groups) = self.vo_frame()?;
        instance.prepare_for_type(type_id)?;
        instance.add_mixins(mixins);
        *groups = group_count;
        if group_count > 0 {
            self.expect(State::VoFields, 1);
            return Ok(Step::Await);
        }
        self.vo_next_block()
    }

    fn vo_custom(&mut self, bytes: &[u8]) -> Result<Step> {
        let (instance, _) = self.vo_frame()?;
        instance.accept_raw(bytes)?;
        self.finish_value_object()
    }

    fn vo_fields(&mut self, flags: u8) -> Result<Step> {
        let (instance, groups) = self.vo_frame()?;
        instance.prepare_field_group(flags)?;
        trace!(flags, "value-object: field group");

        if flags != 0 {
            if !instance.has_pending_values_in_group() {
                return Err(Error::VoMismatch(flags));
            }
            self.expect_header();
            return Ok(Step::Await);
        }

        // No values in this group
        *groups = groups.saturating_sub(1);
        if *groups > 0 {
            self.expect(State::VoFields, 1);
            return Ok(Step::Await);
        }
        self.vo_next_block()
    }

    /// All field groups of a block are read: continue with the next mixin or finish.
    fn vo_next_block(&mut self) -> Result<Step> {
        let (instance, _) = self.vo_frame()?;
        if instance.has_pending_mixins() {
            instance.consume_one_mixin();
            trace!("value-object: next mixin block");
            self.expect(State::VoHeader, 1);
            return Ok(Step::Await);
        }
        self.finish_value_object()
    }

    fn finish_value_object(&mut self) -> Result<Step> {
        match self.stack.pop() {
            Some(Frame::ValueObject { instance, .. }) => {
                trace!(depth = self.stack.len(), "value-object: complete");
                Ok(Step::Emit(instance.finalize()?))
            }
            _ => Err(Error::InvalidState),
        }
    }
}

/// Copy a big-endian field into a fixed array. `bytes` holds at least `N` bytes.
#[inline]
fn be<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut buf = [0u8; N];
    buf.copy_from_slice(&bytes[..N]);
    buf
}

/// Read a 16- or 32-bit length prefix.
fn read_length(bytes: &[u8]) -> Result<usize> {
    let len = match bytes.len() {
        2 => u64::from(u16::from_be_bytes(be(bytes))),
        _ => u64::from(u32::from_be_bytes(be(bytes))),
    };
    if len > limits::MAX_WIRE_LENGTH as u64 {
        return Err(Error::LengthOutOfRange(len));
    }
    usize::try_from(len).map_err(|_| Error::LengthOutOfRange(len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msgpack;

    fn decode(data: &[u8]) -> Result<Value> {
        Decoder::new().decode(data)
    }

    #[test]
    fn test_decode_fixints() {
        assert_eq!(decode(&[0x00]).unwrap(), Value::Int(0));
        assert_eq!(decode(&[0x7f]).unwrap(), Value::Int(127));
        assert_eq!(decode(&[0xe0]).unwrap(), Value::Int(-32));
        assert_eq!(decode(&[0xff]).unwrap(), Value::Int(-1));
    }

    #[test]
    fn test_decode_nil_bool() {
        assert_eq!(decode(&[0xc0]).unwrap(), Value::Nil);
        assert_eq!(decode(&[0xc2]).unwrap(), Value::Bool(false));
        assert_eq!(decode(&[0xc3]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_decode_unsigned_widen_without_sign_extension() {
        assert_eq!(decode(&[0xcc, 0xff]).unwrap(), Value::Int(255));
        assert_eq!(decode(&[0xcd, 0xff, 0xff]).unwrap(), Value::Int(65_535));
        assert_eq!(
            decode(&[0xce, 0xff, 0xff, 0xff, 0xff]).unwrap(),
            Value::Int(4_294_967_295)
        );
        assert_eq!(
            decode(&[0xcf, 0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]).unwrap(),
            Value::Int(i64::MAX)
        );
    }

    #[test]
    fn test_decode_uint64_top_bit_promotes_to_big_int() {
        // 2^63 + 5
        let value = decode(&[0xcf, 0x80, 0, 0, 0, 0, 0, 0, 0x05]).unwrap();
        let expected: BigUint = "9223372036854775813".parse().unwrap();
        assert_eq!(value, Value::BigInt(expected));
        assert_eq!(value.as_u64(), Some(9_223_372_036_854_775_813));

        let value = decode(&[0xcf, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]).unwrap();
        assert_eq!(value.as_u64(), Some(u64::MAX));
    }

    #[test]
    fn test_decode_signed_sign_extend() {
        assert_eq!(decode(&[0xd0, 0x80]).unwrap(), Value::Int(-128));
        assert_eq!(decode(&[0xd1, 0xfc, 0x18]).unwrap(), Value::Int(-1000));
        assert_eq!(decode(&[0xd2, 0xff, 0xff, 0xff, 0xfe]).unwrap(), Value::Int(-2));
        assert_eq!(
            decode(&[0xd3, 0x80, 0, 0, 0, 0, 0, 0, 0]).unwrap(),
            Value::Int(i64::MIN)
        );
    }

    #[test]
    fn test_decode_floats_keep_width() {
        // 1.5f32 = 0x3fc00000
        assert_eq!(
            decode(&[0xca, 0x3f, 0xc0, 0x00, 0x00]).unwrap(),
            Value::Float32(1.5)
        );
        // 1.5f64 = 0x3ff8000000000000
        assert_eq!(
            decode(&[0xcb, 0x3f, 0xf8, 0, 0, 0, 0, 0, 0]).unwrap(),
            Value::Float64(1.5)
        );
    }

    #[test]
    fn test_decode_raw() {
        assert_eq!(decode(&[0xa0]).unwrap(), Value::raw(""));
        assert_eq!(decode(&[0xa2, b'v', b'o']).unwrap(), Value::raw("vo"));
        assert_eq!(decode(&[0xda, 0x00, 0x01, b'x']).unwrap(), Value::raw("x"));
        assert_eq!(decode(&[0xda, 0x00, 0x00]).unwrap(), Value::raw(""));
        assert_eq!(
            decode(&[0xdb, 0x00, 0x00, 0x00, 0x02, 0x01, 0x02]).unwrap(),
            Value::raw(vec![0x01u8, 0x02])
        );
    }

    #[test]
    fn test_empty_array_consumes_only_header() {
        let mut dec = Decoder::new();
        let data = [0x90, 0xc0];
        assert_eq!(dec.advance(&data, 0, data.len()).unwrap(), 1);
        assert!(dec.is_finished());
        assert_eq!(dec.take_result(), Some(Value::Array(vec![])));
    }

    #[test]
    fn test_decode_containers() {
        assert_eq!(decode(&[0x93, 0x01, 0x02, 0x03]).unwrap(), msgpack!([1, 2, 3]));
        assert_eq!(decode(&[0x80]).unwrap(), Value::Map(vec![]));
        assert_eq!(decode(&[0xdc, 0x00, 0x00]).unwrap(), Value::Array(vec![]));
        assert_eq!(
            decode(&[0xdd, 0x00, 0x00, 0x00, 0x02, 0xc3, 0xc2]).unwrap(),
            msgpack!([true, false])
        );
        assert_eq!(
            decode(&[0xde, 0x00, 0x01, 0xa1, b'a', 0x01]).unwrap(),
            msgpack!({ "a": 1 })
        );
    }

    #[test]
    fn test_map_pairs_keep_order() {
        // {"b": 2, "a": [nil]}
        let data = [0x82, 0xa1, b'b', 0x02, 0xa1, b'a', 0x91, 0xc0];
        let value = decode(&data).unwrap();
        assert_eq!(value, msgpack!({ "b": 2, "a": [nil] }));
        let pairs = value.as_map().unwrap();
        assert_eq!(pairs[0].0, Value::raw("b"));
        assert_eq!(pairs[1].0, Value::raw("a"));
    }

    #[test]
    fn test_map_keys_are_not_deduplicated() {
        let data = [0x82, 0x01, 0xc2, 0x01, 0xc3];
        let value = decode(&data).unwrap();
        assert_eq!(
            value,
            Value::Map(vec![
                (Value::Int(1), Value::Bool(false)),
                (Value::Int(1), Value::Bool(true)),
            ])
        );
    }

    fn nested_arrays(depth: usize) -> Vec<u8> {
        let mut data = vec![0x91; depth];
        data.push(0xc0);
        data
    }

    #[test]
    fn test_nesting_at_max_depth() {
        let value = decode(&nested_arrays(limits::MAX_DEPTH)).unwrap();
        let mut inner = &value;
        for _ in 0..limits::MAX_DEPTH {
            inner = inner.get(0).unwrap();
        }
        assert_eq!(inner, &Value::Nil);
    }

    #[test]
    fn test_nesting_beyond_max_depth() {
        assert_eq!(
            decode(&nested_arrays(limits::MAX_DEPTH + 1)),
            Err(Error::MaxDepthExceeded(limits::MAX_DEPTH))
        );

        let config = DecoderConfig {
            max_depth: 2,
            ..DecoderConfig::default()
        };
        let mut dec = Decoder::with_config(config);
        assert!(dec.decode(&nested_arrays(2)).is_ok());
        assert_eq!(dec.decode(&nested_arrays(3)), Err(Error::MaxDepthExceeded(2)));
    }

    #[test]
    fn test_invalid_type_codes() {
        for code in [0xc1, 0xc4, 0xc9, 0xd4, 0xd6, 0xd8, 0xd9] {
            assert_eq!(decode(&[code]), Err(Error::InvalidTypeCode(code)));
        }
    }

    #[test]
    fn test_length_out_of_range() {
        assert_eq!(
            decode(&[0xdb, 0x80, 0x00, 0x00, 0x00]),
            Err(Error::LengthOutOfRange(0x8000_0000))
        );
        assert_eq!(
            decode(&[0xdd, 0xff, 0xff, 0xff, 0xff]),
            Err(Error::LengthOutOfRange(0xffff_ffff))
        );
    }

    #[test]
    fn test_configured_limits() {
        let config = DecoderConfig {
            max_raw_length: 2,
            max_container_size: 1,
            ..DecoderConfig::default()
        };
        let mut dec = Decoder::with_config(config);
        assert_eq!(dec.decode(&[0xa3, 1, 2, 3]), Err(Error::MaxRawLengthExceeded(3)));
        dec.reset();
        assert_eq!(dec.decode(&[0x92, 1, 2]), Err(Error::MaxContainerSizeExceeded(2)));
        dec.reset();
        assert_eq!(dec.decode(&[0x91, 0xa2, 1, 2]).unwrap(), Value::Array(vec![Value::raw(vec![1u8, 2])]));
    }

    #[test]
    fn test_value_object_without_helper() {
        assert_eq!(decode(&[0xd7, 0x80, 0x01]), Err(Error::MissingVoHelper));
    }

    #[test]
    fn test_poisoned_until_reset() {
        let mut dec = Decoder::new();
        assert_eq!(dec.advance(&[0xc1], 0, 1), Err(Error::InvalidTypeCode(0xc1)));
        assert_eq!(dec.advance(&[0xc0], 0, 1), Err(Error::Poisoned));
        dec.reset();
        assert_eq!(dec.advance(&[0xc0], 0, 1), Ok(1));
        assert_eq!(dec.take_result(), Some(Value::Nil));
    }

    #[test]
    fn test_finished_consumes_nothing_more() {
        let mut dec = Decoder::new();
        let data = [0x01, 0x02];
        assert_eq!(dec.advance(&data, 0, 2).unwrap(), 1);
        assert_eq!(dec.advance(&data, 1, 2).unwrap(), 1);
        assert_eq!(dec.result(), Some(&Value::Int(1)));

        dec.reset();
        assert_eq!(dec.advance(&data, 1, 2).unwrap(), 2);
        assert_eq!(dec.take_result(), Some(Value::Int(2)));
    }

    #[test]
    fn test_resume_inside_scalar_and_container() {
        // [65535, "ab"] fed one byte at a time
        let data = [0x92, 0xcd, 0xff, 0xff, 0xa2, b'a', b'b'];
        let mut dec = Decoder::new();
        let mut pending: Vec<u8> = Vec::new();
        for &byte in &data {
            pending.push(byte);
            let consumed = dec.advance(&pending, 0, pending.len()).unwrap();
            pending.drain(..consumed);
        }
        assert!(dec.is_finished());
        assert!(pending.is_empty());
        assert_eq!(dec.take_result(), Some(msgpack!([65535, "ab"])));
    }

    #[test]
    fn test_offset_and_limit_window() {
        let data = [0xff, 0xff, 0x92, 0x01, 0x02, 0xff];
        let mut dec = Decoder::new();
        assert!(!dec.has_partial_message());
        assert_eq!(dec.advance(&data, 2, 4).unwrap(), 4);
        assert!(!dec.is_finished());
        assert!(dec.has_partial_message());
        assert_eq!(dec.depth(), 1);
        assert_eq!(dec.advance(&data, 4, 5).unwrap(), 5);
        assert!(!dec.has_partial_message());
        assert_eq!(dec.take_result(), Some(msgpack!([1, 2])));

        // Mid-scalar with no open container
        dec.reset();
        assert_eq!(dec.advance(&[0xcd, 0x01], 0, 2).unwrap(), 1);
        assert_eq!(dec.depth(), 0);
        assert!(dec.has_partial_message());
    }

    #[test]
    fn test_offset_past_limit_is_empty_window() {
        let mut dec = Decoder::new();
        assert_eq!(dec.advance(&[0x01, 0x02, 0x03], 3, 1).unwrap(), 1);
        assert!(!dec.has_partial_message());

        // Waiting inside a uint16
        assert_eq!(dec.advance(&[0xcd], 0, 1).unwrap(), 1);
        assert_eq!(dec.advance(&[0xcd, 0x00, 0x05], 3, 1).unwrap(), 1);
        assert!(!dec.is_finished());
        assert_eq!(dec.advance(&[0x00, 0x05], 0, 2).unwrap(), 2);
        assert_eq!(dec.take_result(), Some(Value::Int(5)));
    }

    #[test]
    fn test_decode_truncated_and_trailing() {
        assert_eq!(decode(&[0x92, 0x01]), Err(Error::Truncated));
        assert_eq!(decode(&[]), Err(Error::Truncated));
        assert_eq!(decode(&[0x01, 0x02]), Err(Error::TrailingBytes));

        let config = DecoderConfig {
            allow_trailing_bytes: true,
            ..DecoderConfig::default()
        };
        assert_eq!(Decoder::with_config(config).decode(&[0x01, 0x02]), Ok(Value::Int(1)));
    }

    #[test]
    fn test_reset_reuses_decoder() {
        let mut dec = Decoder::new();
        // abandon a message half-way
        assert_eq!(dec.advance(&[0x93, 0x01], 0, 2).unwrap(), 2);
        assert_eq!(dec.depth(), 1);
        dec.reset();
        assert_eq!(dec.depth(), 0);
        assert_eq!(dec.decode(&[0x91, 0xc3]).unwrap(), msgpack!([true]));
    }
}

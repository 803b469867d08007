// ABOUTME: Defines MessagePack type codes and the Value-Object header layout.
// ABOUTME: Type codes map directly to the wire format's leading byte values.

/// Type codes for MessagePack values.
/// Only the codes understood by this decoder are listed; everything else is a parse error.
pub mod type_code {
    // Positive fixint: 0x00-0x7f
    pub const POSITIVE_FIXINT_MAX: u8 = 0x7f;

    // Fixmap: 0x80-0x8f, fixarray: 0x90-0x9f, fixraw: 0xa0-0xbf
    pub const FIXMAP: u8 = 0x80;
    pub const FIXARRAY: u8 = 0x90;
    pub const FIXRAW: u8 = 0xa0;

    // Nil and booleans
    pub const NIL: u8 = 0xc0;
    pub const FALSE: u8 = 0xc2;
    pub const TRUE: u8 = 0xc3;

    // Fixed-width scalars
    pub const FLOAT32: u8 = 0xca;
    pub const FLOAT64: u8 = 0xcb;
    pub const UINT8: u8 = 0xcc;
    pub const UINT16: u8 = 0xcd;
    pub const UINT32: u8 = 0xce;
    pub const UINT64: u8 = 0xcf;
    pub const INT8: u8 = 0xd0;
    pub const INT16: u8 = 0xd1;
    pub const INT32: u8 = 0xd2;
    pub const INT64: u8 = 0xd3;

    // Value-Object marker
    pub const VALUE_OBJECT: u8 = 0xd7;

    // Length-prefixed raw and containers
    pub const RAW16: u8 = 0xda;
    pub const RAW32: u8 = 0xdb;
    pub const ARRAY16: u8 = 0xdc;
    pub const ARRAY32: u8 = 0xdd;
    pub const MAP16: u8 = 0xde;
    pub const MAP32: u8 = 0xdf;

    // Negative fixint: 0xe0-0xff
    pub const NEGATIVE_FIXINT_MIN: u8 = 0xe0;

    /// Check if a type code is a positive fixint (0 to 127)
    #[inline]
    pub const fn is_positive_fixint(code: u8) -> bool {
        code <= POSITIVE_FIXINT_MAX
    }

    /// Check if a type code is a negative fixint (-32 to -1)
    #[inline]
    pub const fn is_negative_fixint(code: u8) -> bool {
        code >= NEGATIVE_FIXINT_MIN
    }

    /// Decode a fixint type code (positive or negative) to its value
    #[inline]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn fixint_value(code: u8) -> i64 {
        code as i8 as i64
    }

    /// Check if a type code is a fixraw (0-31 bytes)
    #[inline]
    pub const fn is_fixraw(code: u8) -> bool {
        code & 0xe0 == FIXRAW
    }

    /// Check if a type code is a fixarray (0-15 items)
    #[inline]
    pub const fn is_fixarray(code: u8) -> bool {
        code & 0xf0 == FIXARRAY
    }

    /// Check if a type code is a fixmap (0-15 pairs)
    #[inline]
    pub const fn is_fixmap(code: u8) -> bool {
        code & 0xf0 == FIXMAP
    }

    /// Get the length of a fixraw from its type code
    #[inline]
    pub const fn fixraw_len(code: u8) -> usize {
        (code & 0x1f) as usize
    }

    /// Get the element count of a fixarray or the pair count of a fixmap
    #[inline]
    pub const fn fix_container_len(code: u8) -> usize {
        (code & 0x0f) as usize
    }

    /// Payload width of a fixed-width scalar: 2^(low 2 bits)
    #[inline]
    pub const fn fixed_scalar_width(code: u8) -> usize {
        1 << (code & 0x03)
    }

    /// Width of the length prefix of raw16/raw32, array16/array32, map16/map32
    #[inline]
    pub const fn length_prefix_width(code: u8) -> usize {
        2 << (code & 0x01)
    }
}

/// Bit layout of a Value-Object header byte.
///
/// ```text
///   bit 7     set: structured Value-Object, clear: custom value type (bits 0-6 = type ID)
///   bit 6     type ID is 2 bytes (else 1 byte)
///   bits 5-3  mixin blocks to add to the pending mixin count
///   bits 2-0  field-group count for this block
/// ```
pub mod vo_header {
    pub const STRUCTURED: u8 = 0x80;
    pub const WIDE_TYPE_ID: u8 = 0x40;
    pub const MIXIN_MASK: u8 = 0x38;
    pub const GROUP_MASK: u8 = 0x07;

    /// Check if the header introduces a structured Value-Object
    #[inline]
    pub const fn is_structured(header: u8) -> bool {
        header & STRUCTURED != 0
    }

    /// Number of type ID bytes following a structured header
    #[inline]
    pub const fn type_id_width(header: u8) -> usize {
        if header & WIDE_TYPE_ID != 0 {
            2
        } else {
            1
        }
    }

    /// Number of mixin blocks this header adds
    #[inline]
    pub const fn mixin_count(header: u8) -> u32 {
        ((header & MIXIN_MASK) >> 3) as u32
    }

    /// Number of field groups in this block
    #[inline]
    pub const fn group_count(header: u8) -> u8 {
        header & GROUP_MASK
    }
}

/// Default resource limits.
pub mod limits {
    /// Maximum container nesting depth (Value-Objects count as containers)
    pub const MAX_DEPTH: usize = 32;

    /// Largest length or count a 32-bit prefix may carry
    pub const MAX_WIRE_LENGTH: usize = 0x7fff_ffff;

    /// Maximum raw length in bytes
    pub const MAX_RAW_LENGTH: usize = MAX_WIRE_LENGTH;

    /// Maximum elements (or pairs) in a single container
    pub const MAX_CONTAINER_SIZE: usize = MAX_WIRE_LENGTH;

    /// Upper bound on capacity reserved up front for a container, whatever its declared count
    pub const MAX_PREALLOCATION: usize = 4096;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixint_codes() {
        assert!(type_code::is_positive_fixint(0x00));
        assert!(type_code::is_positive_fixint(0x7f));
        assert!(!type_code::is_positive_fixint(0x80));
        assert!(type_code::is_negative_fixint(0xe0));
        assert!(type_code::is_negative_fixint(0xff));
        assert!(!type_code::is_negative_fixint(0xdf));

        assert_eq!(type_code::fixint_value(0x7f), 127);
        assert_eq!(type_code::fixint_value(0xff), -1);
        assert_eq!(type_code::fixint_value(0xe0), -32);
    }

    #[test]
    fn test_fix_container_codes() {
        assert!(type_code::is_fixraw(0xa0));
        assert!(type_code::is_fixraw(0xbf));
        assert!(!type_code::is_fixraw(0xc0));
        assert_eq!(type_code::fixraw_len(0xa2), 2);
        assert_eq!(type_code::fixraw_len(0xbf), 31);

        assert!(type_code::is_fixarray(0x9f));
        assert!(type_code::is_fixmap(0x8f));
        assert!(!type_code::is_fixmap(0x90));
        assert_eq!(type_code::fix_container_len(0x93), 3);
    }

    #[test]
    fn test_scalar_widths() {
        assert_eq!(type_code::fixed_scalar_width(type_code::FLOAT32), 4);
        assert_eq!(type_code::fixed_scalar_width(type_code::FLOAT64), 8);
        assert_eq!(type_code::fixed_scalar_width(type_code::UINT8), 1);
        assert_eq!(type_code::fixed_scalar_width(type_code::UINT16), 2);
        assert_eq!(type_code::fixed_scalar_width(type_code::INT32), 4);
        assert_eq!(type_code::fixed_scalar_width(type_code::INT64), 8);

        assert_eq!(type_code::length_prefix_width(type_code::RAW16), 2);
        assert_eq!(type_code::length_prefix_width(type_code::ARRAY32), 4);
        assert_eq!(type_code::length_prefix_width(type_code::MAP16), 2);
    }

    #[test]
    fn test_vo_header_bits() {
        // 0x82: structured, 1-byte type ID, no mixins, 2 field groups
        assert!(vo_header::is_structured(0x82));
        assert_eq!(vo_header::type_id_width(0x82), 1);
        assert_eq!(vo_header::mixin_count(0x82), 0);
        assert_eq!(vo_header::group_count(0x82), 2);

        // 0x90: structured, no field groups, 2 mixins
        assert_eq!(vo_header::mixin_count(0x90), 2);
        assert_eq!(vo_header::group_count(0x90), 0);

        // 0xff: everything set
        assert_eq!(vo_header::type_id_width(0xff), 2);
        assert_eq!(vo_header::mixin_count(0xff), 7);
        assert_eq!(vo_header::group_count(0xff), 7);

        assert!(!vo_header::is_structured(0x7f));
    }
}

// ABOUTME: Value-Object plugin contract consumed by the streaming decoder.
// ABOUTME: The embedding application turns type IDs, field bitmaps and field values into objects.

//! The Value-Object plugin contract.
//!
//! A `0xd7` marker introduces a Value-Object. The decoder asks the registered
//! [`VoHelper`] for a fresh [`VoInstance`] and then drives it through the
//! header blocks that follow:
//!
//! ```text
//!   0xd7
//!   header  ── bit 7 clear ──> custom value type:
//!      │                        process_value_type(id) -> n, accept_raw(n bytes), finalize()
//!      │
//!      └─ bit 7 set ──> prepare_for_type(id), add_mixins(m)
//!                         for each field group:
//!                           prepare_field_group(flags)
//!                           accept_value(v) while has_pending_values_in_group()
//!                         if has_pending_mixins(): consume_one_mixin(), next header
//!                         else finalize()
//! ```
//!
//! One instance lives for the whole chain of header blocks, so every mixin
//! contributes to the same object, and [`VoInstance::finalize`] runs exactly once.

use crate::error::Result;
use crate::value::Value;

/// Factory for Value-Object instances, registered on a [`Decoder`](crate::Decoder).
///
/// The decoder shares the helper (it is held behind an `Arc`) and never mutates it.
pub trait VoHelper: Send + Sync {
    /// Create the instance that will receive one Value-Object's data.
    fn create_instance(&self) -> Box<dyn VoInstance>;
}

/// Receives the data of one Value-Object, including all of its mixin blocks.
///
/// Errors returned from any method abort decoding; the decoder reports them
/// as format errors and must be reset.
pub trait VoInstance: Send {
    /// A custom value type with this 7-bit ID follows. Returns how many raw
    /// payload bytes belong to it.
    fn process_value_type(&mut self, type_id: u8) -> Result<usize>;

    /// Delivers the payload of a custom value type.
    fn accept_raw(&mut self, bytes: &[u8]) -> Result<()>;

    /// A structured header block for this type ID starts.
    fn prepare_for_type(&mut self, type_id: u16) -> Result<()>;

    /// A field-group bitmap was read. Each set bit is a field whose value
    /// follows, in ascending bit order. The instance must track how many are owed.
    fn prepare_field_group(&mut self, flags: u8) -> Result<()>;

    /// Delivers the value of the next flagged field.
    fn accept_value(&mut self, value: Value) -> Result<()>;

    /// Whether the current field group still owes values.
    fn has_pending_values_in_group(&self) -> bool;

    /// Adds mixin blocks announced by a header. The count accumulates across
    /// blocks and may grow past 7.
    fn add_mixins(&mut self, count: u32);

    /// Whether another mixin header block follows.
    fn has_pending_mixins(&self) -> bool;

    /// Marks one pending mixin block as being read.
    fn consume_one_mixin(&mut self);

    /// Builds the decoded value once the chain is complete.
    fn finalize(self: Box<Self>) -> Result<Value>;
}

/// Counts the set bits of a field-group bitmap, i.e. how many values follow it.
#[inline]
#[must_use]
pub fn flagged_fields(flags: u8) -> u32 {
    flags.count_ones()
}

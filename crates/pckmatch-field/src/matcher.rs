use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::error::{FieldError, Result};
use crate::field::{to_offset, Field};
use crate::resize::put_resized;

/// Reserved name of the implicit remainder field.
pub const REST: &str = "rest";

/// Opaque handle to a field registered on a [`FieldMatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(usize);

#[derive(Debug, Clone)]
struct Slot {
    name: String,
    field: Field,
}

/// Named fields over one message layout.
///
/// Front fields are kept in `sequence`, back fields in `reverse`, both in
/// registration order. The first back field covers the last bytes of the
/// buffer and every later back field sits just before the previous one.
/// `rest` spans whatever is left between the two groups.
#[derive(Debug, Clone)]
pub struct FieldMatcher {
    slots: Vec<Slot>,
    names: HashMap<String, FieldId>,
    sequence: Vec<FieldId>,
    reverse: Vec<FieldId>,
    rest: Field,
}

impl FieldMatcher {
    /// Create a matcher where `rest` covers the whole buffer.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            names: HashMap::new(),
            sequence: Vec::new(),
            reverse: Vec::new(),
            rest: Field::new(0, false),
        }
    }

    /// Register a field.
    ///
    /// The anchor of `field` decides where it goes: `start >= 0` appends it
    /// to the front sequence, `start < 0` to the back. An empty name (or
    /// `"rest"`) registers an anonymous span named `+N` or `-N`; those
    /// positional names are reserved and rejected when passed explicitly.
    pub fn add_field(&mut self, name: &str, field: Field) -> Result<FieldId> {
        self.register(name, field)
    }

    /// Register a back field. Routing still follows the field's own anchor.
    pub fn add_rev_field(&mut self, name: &str, field: Field) -> Result<FieldId> {
        self.register(name, field)
    }

    /// Register an anonymous placeholder. Negative sizes anchor at the back.
    pub fn add_span(&mut self, size: isize) -> Result<FieldId> {
        self.register("", Field::new(size, false))
    }

    /// Register several anonymous fixed fields in order.
    pub fn add_fixeds(&mut self, sizes: &[isize]) -> Result<Vec<FieldId>> {
        sizes.iter().map(|&size| self.add_span(size)).collect()
    }

    fn register(&mut self, name: &str, mut field: Field) -> Result<FieldId> {
        let reversed = field.is_reversed();
        let name = if name.is_empty() || name == REST {
            if reversed {
                format!("-{}", self.reverse.len())
            } else {
                format!("+{}", self.sequence.len())
            }
        } else if is_positional(name) {
            return Err(FieldError::ReservedName(name.to_owned()));
        } else {
            name.to_owned()
        };
        if self.names.contains_key(&name) {
            return Err(FieldError::DuplicateName(name));
        }

        let size = to_offset(field.size);
        if reversed {
            field.start += self.rest.stop;
            if size > 0 {
                field.stop = field.start + size;
                if !field.optional {
                    self.rest.stop = field.start;
                }
            }
        } else {
            field.start += self.rest.start;
            if size > 0 {
                field.stop = field.start + size;
                if !field.optional {
                    self.rest.start = field.stop;
                }
            }
        }

        debug!(
            name = %name,
            start = field.start,
            stop = field.stop,
            optional = field.optional,
            "registered field"
        );

        let id = FieldId(self.slots.len());
        self.slots.push(Slot {
            name: name.clone(),
            field,
        });
        self.names.insert(name, id);
        if reversed {
            self.reverse.push(id);
        } else {
            self.sequence.push(id);
        }
        Ok(id)
    }

    /// Look up a registered field by handle.
    pub fn field(&self, id: FieldId) -> Option<&Field> {
        self.slots.get(id.0).map(|slot| &slot.field)
    }

    /// Mutable access, for variable-length fields resolved after registration.
    pub fn field_mut(&mut self, id: FieldId) -> Option<&mut Field> {
        self.slots.get_mut(id.0).map(|slot| &mut slot.field)
    }

    /// Handle of a named field. `"rest"` has no handle; see [`Self::rest`].
    pub fn id(&self, name: &str) -> Option<FieldId> {
        self.names.get(name).copied()
    }

    /// Name of a registered field.
    pub fn name(&self, id: FieldId) -> Option<&str> {
        self.slots.get(id.0).map(|slot| slot.name.as_str())
    }

    /// The implicit remainder field.
    pub fn rest(&self) -> &Field {
        &self.rest
    }

    /// Front fields, in registration order.
    pub fn sequence(&self) -> &[FieldId] {
        &self.sequence
    }

    /// Back fields, in registration order.
    pub fn reverse(&self) -> &[FieldId] {
        &self.reverse
    }

    /// Number of registered fields, `rest` excluded.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when no field has been registered.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Field count and the sum of declared sizes.
    pub fn least_size(&self) -> (usize, usize) {
        let least = self.slots.iter().map(|slot| slot.field.size).sum();
        (self.slots.len(), least)
    }

    /// Slice every field out of `chunk`.
    ///
    /// Fields that do not fit are absent. With `include_rest` the remainder
    /// is resolved too and reachable under `"rest"`.
    pub fn match_bytes<'a>(&self, chunk: &'a [u8], include_rest: bool) -> MatchedFields<'_, 'a> {
        let slots = self
            .slots
            .iter()
            .map(|slot| slot.field.slice(chunk))
            .collect();
        let rest = include_rest.then(|| self.rest.slice(chunk));
        MatchedFields {
            matcher: self,
            slots,
            rest,
        }
    }

    /// Slice the first `count` front fields.
    ///
    /// Also returns the end offset of the last of them, or `0` when it is
    /// absent.
    pub fn match_head<'a>(&self, chunk: &'a [u8], count: usize) -> (Vec<Option<&'a [u8]>>, usize) {
        let mut stop = 0;
        let result = self
            .sequence
            .iter()
            .take(count)
            .map(|id| {
                let range = self.slots[id.0].field.resolve(0, chunk.len());
                stop = range.as_ref().map_or(0, |r| r.end);
                range.map(|r| &chunk[r])
            })
            .collect();
        (result, stop)
    }

    /// Pack field values into one buffer.
    ///
    /// Order: front fields, `rest` (when supplied), then back fields from
    /// the one nearest `rest` to the one at the very end. Fixed fields are
    /// resized to their width with leading zeros or left truncation; missing
    /// values become zeros. Optional fields overlay other ranges and are not
    /// written.
    pub fn build(&self, values: &impl FieldValues) -> Bytes {
        let (_, least) = self.least_size();
        let rest = values.value(REST);
        let mut dst = BytesMut::with_capacity(least + rest.map_or(0, <[u8]>::len));

        for id in &self.sequence {
            self.put_field(&mut dst, *id, values);
        }
        if let Some(rest) = rest {
            dst.extend_from_slice(rest);
        }
        for id in self.reverse.iter().rev() {
            self.put_field(&mut dst, *id, values);
        }
        dst.freeze()
    }

    fn put_field(&self, dst: &mut BytesMut, id: FieldId, values: &impl FieldValues) {
        let slot = &self.slots[id.0];
        if slot.field.optional {
            return;
        }
        let value = values.value(&slot.name).unwrap_or_default();
        put_resized(dst, value, slot.field.size);
    }
}

impl Default for FieldMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of [`FieldMatcher::match_bytes`]: borrowed slices keyed by field.
#[derive(Debug, Clone)]
pub struct MatchedFields<'m, 'a> {
    matcher: &'m FieldMatcher,
    slots: Vec<Option<&'a [u8]>>,
    rest: Option<Option<&'a [u8]>>,
}

impl<'m, 'a> MatchedFields<'m, 'a> {
    /// Bytes of a named field, `None` when unknown or absent.
    pub fn get(&self, name: &str) -> Option<&'a [u8]> {
        if name == REST {
            return self.rest.flatten();
        }
        self.matcher.id(name).and_then(|id| self.by_id(id))
    }

    /// Bytes of a field by handle.
    pub fn by_id(&self, id: FieldId) -> Option<&'a [u8]> {
        self.slots.get(id.0).copied().flatten()
    }

    /// Bytes of the remainder, when it was requested and fits.
    pub fn rest(&self) -> Option<&'a [u8]> {
        self.rest.flatten()
    }

    /// True when `name` was part of the match, present or not.
    pub fn contains(&self, name: &str) -> bool {
        if name == REST {
            self.rest.is_some()
        } else {
            self.matcher.id(name).is_some()
        }
    }

    /// Number of matched entries, `rest` included when requested.
    pub fn len(&self) -> usize {
        self.slots.len() + usize::from(self.rest.is_some())
    }

    /// True when nothing was matched.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries in buffer order: front fields, `rest`, back fields.
    pub fn iter(&self) -> impl Iterator<Item = (&'m str, Option<&'a [u8]>)> + '_ {
        let matcher = self.matcher;
        let entry = move |id: &FieldId| (matcher.slots[id.0].name.as_str(), self.by_id(*id));
        let front = matcher.sequence.iter().map(entry);
        let rest = self.rest.map(|rest| (REST, rest));
        let back = matcher.reverse.iter().rev().map(entry);
        front.chain(rest).chain(back)
    }

    /// Copy the present entries into an owned map.
    pub fn to_map(&self) -> HashMap<String, Bytes> {
        self.iter()
            .filter_map(|(name, value)| value.map(|v| (name.to_owned(), Bytes::copy_from_slice(v))))
            .collect()
    }
}

/// Source of named values for [`FieldMatcher::build`].
pub trait FieldValues {
    /// Bytes for the field `name`, if any.
    fn value(&self, name: &str) -> Option<&[u8]>;
}

impl<K, V, S> FieldValues for HashMap<K, V, S>
where
    K: Borrow<str> + Hash + Eq,
    V: AsRef<[u8]>,
    S: BuildHasher,
{
    fn value(&self, name: &str) -> Option<&[u8]> {
        self.get(name).map(AsRef::as_ref)
    }
}

impl<K, V> FieldValues for BTreeMap<K, V>
where
    K: Borrow<str> + Ord,
    V: AsRef<[u8]>,
{
    fn value(&self, name: &str) -> Option<&[u8]> {
        self.get(name).map(AsRef::as_ref)
    }
}

impl FieldValues for MatchedFields<'_, '_> {
    fn value(&self, name: &str) -> Option<&[u8]> {
        self.get(name)
    }
}

/// `+N` or `-N`, the shape of an anonymous span's name.
fn is_positional(name: &str) -> bool {
    name.strip_prefix(['+', '-'])
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_matcher() -> FieldMatcher {
        let mut m = FieldMatcher::new();
        m.add_field("code", Field::fixed(2)).unwrap();
        m.add_field("props", Field::fixed(2)).unwrap();
        m.add_rev_field("check", Field::rev(1)).unwrap();
        m
    }

    #[test]
    fn front_fields_narrow_rest() {
        let m = header_matcher();
        let code = m.field(m.id("code").unwrap()).unwrap();
        let props = m.field(m.id("props").unwrap()).unwrap();
        assert_eq!((code.start, code.stop), (0, 2));
        assert_eq!((props.start, props.stop), (2, 4));
        assert_eq!((m.rest().start, m.rest().stop), (4, -1));
    }

    #[test]
    fn back_fields_peel_from_the_end() {
        let mut m = FieldMatcher::new();
        m.add_rev_field("tail", Field::rev(1)).unwrap();
        m.add_rev_field("check", Field::rev(1)).unwrap();

        let chunk = b"01234567";
        let matched = m.match_bytes(chunk, true);
        assert_eq!(matched.get("tail"), Some(&b"7"[..]));
        assert_eq!(matched.get("check"), Some(&b"6"[..]));
        assert_eq!(matched.rest(), Some(&b"012345"[..]));
    }

    #[test]
    fn add_field_routes_by_anchor() {
        let mut m = FieldMatcher::new();
        let back = m.add_field("crc", Field::rev(2)).unwrap();
        let front = m.add_rev_field("len", Field::fixed(1)).unwrap();
        assert_eq!(m.reverse(), &[back]);
        assert_eq!(m.sequence(), &[front]);
    }

    #[test]
    fn anonymous_and_rest_names_are_positional() {
        let mut m = FieldMatcher::new();
        m.add_field("id", Field::fixed(1)).unwrap();
        let span = m.add_span(3).unwrap();
        let back = m.add_field(REST, Field::rev(2)).unwrap();
        let fixeds = m.add_fixeds(&[1, -1]).unwrap();

        assert_eq!(m.name(span), Some("+1"));
        assert_eq!(m.name(back), Some("-0"));
        assert_eq!(m.name(fixeds[0]), Some("+2"));
        assert_eq!(m.name(fixeds[1]), Some("-1"));
        assert_eq!(m.least_size(), (5, 8));
    }

    #[test]
    fn positional_names_are_reserved() {
        let mut m = FieldMatcher::new();
        let err = m.add_field("+1", Field::fixed(1)).unwrap_err();
        assert!(matches!(err, FieldError::ReservedName(name) if name == "+1"));
        assert!(m.add_field("-0", Field::rev(1)).is_err());
        assert!(m.is_empty());

        m.add_field("+x", Field::fixed(1)).unwrap();
        m.add_span(2).unwrap();
        let span = m.add_span(2).unwrap();
        assert_eq!(m.name(span), Some("+2"));
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut m = FieldMatcher::new();
        m.add_field("id", Field::fixed(1)).unwrap();
        let err = m.add_field("id", Field::rev(1)).unwrap_err();
        assert!(matches!(err, FieldError::DuplicateName(name) if name == "id"));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn optional_field_does_not_narrow_rest() {
        let mut m = FieldMatcher::new();
        m.add_field("kind", Field::fixed(1)).unwrap();
        m.add_field("peek", Field::new(2, true)).unwrap();
        m.add_field("body", Field::fixed(3)).unwrap();

        let matched = m.match_bytes(b"KPQbody", true);
        assert_eq!(matched.get("peek"), Some(&b"PQ"[..]));
        assert_eq!(matched.get("body"), Some(&b"PQb"[..]));
        assert_eq!(matched.rest(), Some(&b"ody"[..]));
    }

    #[test]
    fn truncated_buffer_yields_absent_fields() {
        let m = header_matcher();
        let matched = m.match_bytes(b"\x01\x02\x03", true);
        assert_eq!(matched.get("code"), Some(&b"\x01\x02"[..]));
        assert_eq!(matched.get("props"), None);
        assert_eq!(matched.get("check"), Some(&b"\x03"[..]));
        assert_eq!(matched.rest(), None);
        assert_eq!(matched.get("missing"), None);
    }

    #[test]
    fn rest_only_when_requested() {
        let m = header_matcher();
        let matched = m.match_bytes(b"aabbXYZc", false);
        assert!(!matched.contains(REST));
        assert_eq!(matched.get(REST), None);
        assert_eq!(matched.len(), 3);

        let matched = m.match_bytes(b"aabbXYZc", true);
        assert_eq!(matched.get(REST), Some(&b"XYZ"[..]));
        assert_eq!(matched.len(), 4);
    }

    #[test]
    fn iter_follows_buffer_order() {
        let mut m = FieldMatcher::new();
        m.add_field("a", Field::fixed(1)).unwrap();
        m.add_rev_field("z", Field::rev(1)).unwrap();
        m.add_rev_field("y", Field::rev(1)).unwrap();
        m.add_field("b", Field::fixed(1)).unwrap();

        let matched = m.match_bytes(b"ab--yz", true);
        let order: Vec<_> = matched.iter().collect();
        assert_eq!(
            order,
            vec![
                ("a", Some(&b"a"[..])),
                ("b", Some(&b"b"[..])),
                (REST, Some(&b"--"[..])),
                ("y", Some(&b"y"[..])),
                ("z", Some(&b"z"[..])),
            ]
        );
    }

    #[test]
    fn build_resizes_fixed_fields() {
        let m = header_matcher();
        let mut values: HashMap<&str, Vec<u8>> = HashMap::new();
        values.insert("code", vec![0x07]);
        values.insert("props", vec![0xAA, 0x01, 0x02]);
        values.insert(REST, b"payload".to_vec());

        let packed = m.build(&values);
        assert_eq!(packed.as_ref(), b"\x00\x07\x01\x02payload\x00");
    }

    #[test]
    fn build_places_back_fields_consistently() {
        let mut m = FieldMatcher::new();
        m.add_field("head", Field::fixed(1)).unwrap();
        m.add_rev_field("tail", Field::rev(1)).unwrap();
        m.add_rev_field("check", Field::rev(2)).unwrap();

        let mut values = BTreeMap::new();
        values.insert("head", &b"H"[..]);
        values.insert("tail", &b"T"[..]);
        values.insert("check", &b"CK"[..]);
        values.insert(REST, &b"--"[..]);

        let packed = m.build(&values);
        assert_eq!(packed.as_ref(), b"H--CKT");

        let matched = m.match_bytes(&packed, true);
        assert_eq!(matched.get("tail"), Some(&b"T"[..]));
        assert_eq!(matched.get("check"), Some(&b"CK"[..]));
        assert_eq!(matched.get(REST), Some(&b"--"[..]));
    }

    #[test]
    fn build_skips_optional_and_fills_missing() {
        let mut m = FieldMatcher::new();
        m.add_field("peek", Field::new(2, true)).unwrap();
        m.add_field("len", Field::fixed(2)).unwrap();
        m.add_span(1).unwrap();

        let values: HashMap<String, Bytes> = HashMap::new();
        assert_eq!(m.build(&values).as_ref(), &[0, 0, 0]);
    }

    #[test]
    fn matched_fields_feed_build() {
        let m = header_matcher();
        let original = b"\x01\x02\x03\x04body\x05";
        let matched = m.match_bytes(original, true);
        assert_eq!(m.build(&matched).as_ref(), original);
        assert_eq!(m.build(&matched.to_map()).as_ref(), original);
    }

    #[test]
    fn field_mut_resolves_variable_length_later() {
        let mut m = FieldMatcher::new();
        m.add_field("len", Field::fixed(1)).unwrap();
        let body = m.add_field("body", Field::variable()).unwrap();

        let chunk = b"\x03abcXY";
        let len = usize::from(m.match_bytes(chunk, false).get("len").unwrap()[0]);
        let field = m.field_mut(body).unwrap();
        field.stop = field.start + isize::try_from(len).unwrap();

        assert_eq!(m.match_bytes(chunk, false).by_id(body), Some(&b"abc"[..]));
    }

    #[test]
    fn match_head_reports_stop() {
        let mut m = FieldMatcher::new();
        m.add_fixeds(&[1, 2, 3]).unwrap();

        let (head, stop) = m.match_head(b"abcdef", 2);
        assert_eq!(head, vec![Some(&b"a"[..]), Some(&b"bc"[..])]);
        assert_eq!(stop, 3);

        let (head, stop) = m.match_head(b"abcd", 3);
        assert_eq!(head[2], None);
        assert_eq!(stop, 0);
    }
}

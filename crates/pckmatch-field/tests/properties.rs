//! Layout properties checked over generated field declarations.

use std::collections::HashMap;

use pckmatch_field::{Field, FieldMatcher, REST};
use proptest::prelude::*;

/// `(back, size, value)` per field, with `value.len() <= size`.
fn fields_strategy() -> impl Strategy<Value = Vec<(bool, usize, Vec<u8>)>> {
    prop::collection::vec((any::<bool>(), 1usize..6), 0..8).prop_flat_map(|layout| {
        layout
            .into_iter()
            .map(|(back, size)| {
                (
                    Just(back),
                    Just(size),
                    prop::collection::vec(any::<u8>(), 0..=size),
                )
            })
            .collect::<Vec<_>>()
    })
}

fn matcher_for(fields: &[(bool, usize, Vec<u8>)]) -> FieldMatcher {
    let mut matcher = FieldMatcher::new();
    for (i, (back, size, _)) in fields.iter().enumerate() {
        let field = if *back {
            Field::rev(*size)
        } else {
            Field::fixed(*size)
        };
        matcher
            .add_field(&format!("f{i}"), field)
            .expect("generated names are unique");
    }
    matcher
}

fn padded(size: usize, value: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; size - value.len()];
    out.extend_from_slice(value);
    out
}

proptest! {
    #[test]
    fn build_then_match_round_trips(
        fields in fields_strategy(),
        rest in prop::collection::vec(any::<u8>(), 0..16),
    ) {
        let matcher = matcher_for(&fields);
        let mut values: HashMap<String, Vec<u8>> = fields
            .iter()
            .enumerate()
            .map(|(i, (_, _, value))| (format!("f{i}"), value.clone()))
            .collect();
        values.insert(REST.to_owned(), rest.clone());

        let packed = matcher.build(&values);
        let matched = matcher.match_bytes(&packed, true);

        for (i, (_, size, value)) in fields.iter().enumerate() {
            let name = format!("f{i}");
            let expected = padded(*size, value);
            prop_assert_eq!(matched.get(&name), Some(expected.as_slice()));
        }
        prop_assert_eq!(matched.get(REST), Some(rest.as_slice()));
    }

    #[test]
    fn fixed_fields_and_rest_tile_the_buffer(
        fields in fields_strategy(),
        extra in 0usize..8,
    ) {
        let matcher = matcher_for(&fields);
        let (_, least) = matcher.least_size();
        let len = least + extra;

        let mut ranges: Vec<_> = matcher
            .sequence()
            .iter()
            .chain(matcher.reverse())
            .map(|id| matcher.field(*id).and_then(|f| f.resolve(0, len)))
            .collect::<Option<Vec<_>>>()
            .expect("every field fits a buffer of the full width");
        let rest = matcher.rest().resolve(0, len).expect("rest fits");
        prop_assert_eq!(rest.len(), extra);
        ranges.push(rest);
        ranges.sort_by_key(|r| (r.start, r.end));

        let mut cursor = 0;
        for range in ranges {
            prop_assert_eq!(range.start, cursor);
            cursor = range.end;
        }
        prop_assert_eq!(cursor, len);
    }

    #[test]
    fn short_buffers_never_truncate_fields(
        fields in fields_strategy(),
        chunk in prop::collection::vec(any::<u8>(), 0..24),
    ) {
        let matcher = matcher_for(&fields);
        let matched = matcher.match_bytes(&chunk, true);

        for (i, (_, size, _)) in fields.iter().enumerate() {
            if let Some(slice) = matched.get(&format!("f{i}")) {
                prop_assert_eq!(slice.len(), *size);
            }
        }
        let (_, least) = matcher.least_size();
        prop_assert_eq!(matched.rest().is_some(), chunk.len() >= least);
    }
}

// Copyright Granite Labs, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The table value encoding.
//!
//! Every encoded value starts with a tag pair: the column id as an
//! unsigned varint (zero means "no column id") followed by a type byte,
//! then a type-specific payload. The same encoding is used for column
//! values in table rows and for partition boundary tuples, which is what
//! lets partition spans be compared bytewise against row values.
//!
//! The `NotNull` type carries no payload. With no column id it is a
//! reserved marker: partition encoding uses it for `DEFAULT` (list
//! partitions) and `MAXVALUE` (range partitions), which are
//! distinguished positionally, not by the bytes.

use crate::Datum;

/// The sentinel column id for values that do not belong to a column.
pub const NO_COLUMN_ID: u32 = 0;

/// The type byte of an encoded value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum ValueType {
    Null = 1,
    NotNull = 2,
    Int = 3,
    Float = 4,
    Bytes = 5,
    True = 6,
    False = 7,
}

/// Appends the tag pair for a value of type `typ` in column `col_id`.
pub fn encode_value_tag(buf: &mut Vec<u8>, col_id: u32, typ: ValueType) {
    encode_uvarint(buf, u64::from(col_id));
    buf.push(typ as u8);
}

/// Appends the reserved "NOT NULL, no column" marker.
pub fn encode_not_null_marker(buf: &mut Vec<u8>) {
    encode_value_tag(buf, NO_COLUMN_ID, ValueType::NotNull);
}

/// Appends `datum` in the table value encoding under `col_id`.
pub fn encode_datum(buf: &mut Vec<u8>, col_id: u32, datum: &Datum) {
    match datum {
        Datum::Null => encode_value_tag(buf, col_id, ValueType::Null),
        Datum::True => encode_value_tag(buf, col_id, ValueType::True),
        Datum::False => encode_value_tag(buf, col_id, ValueType::False),
        Datum::Int64(i) => {
            encode_value_tag(buf, col_id, ValueType::Int);
            encode_uvarint(buf, zigzag(*i));
        }
        Datum::Float64(n) => {
            encode_value_tag(buf, col_id, ValueType::Float);
            buf.extend_from_slice(&n.into_inner().to_bits().to_be_bytes());
        }
        Datum::String(s) => {
            encode_value_tag(buf, col_id, ValueType::Bytes);
            encode_uvarint(buf, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        Datum::Bytes(b) => {
            encode_value_tag(buf, col_id, ValueType::Bytes);
            encode_uvarint(buf, b.len() as u64);
            buf.extend_from_slice(b);
        }
    }
}

/// Appends `n` as a base-128 unsigned varint.
pub fn encode_uvarint(buf: &mut Vec<u8>, mut n: u64) {
    loop {
        let byte = (n & 0x7f) as u8;
        n >>= 7;
        if n == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

fn zigzag(i: i64) -> u64 {
    ((i << 1) ^ (i >> 63)) as u64
}

#[cfg(test)]
mod tests {
    use ordered_float::OrderedFloat;
    use proptest::prelude::*;

    use super::*;

    fn arb_datum() -> impl Strategy<Value = Datum> {
        prop_oneof![
            Just(Datum::Null),
            Just(Datum::True),
            Just(Datum::False),
            any::<i64>().prop_map(Datum::Int64),
            any::<f64>().prop_map(|n| Datum::Float64(OrderedFloat(n))),
            ".*".prop_map(Datum::String),
            proptest::collection::vec(any::<u8>(), 0..32).prop_map(Datum::Bytes),
        ]
    }

    #[test]
    fn not_null_marker_has_no_column_id() {
        let mut buf = Vec::new();
        encode_not_null_marker(&mut buf);
        assert_eq!(buf, vec![NO_COLUMN_ID as u8, ValueType::NotNull as u8]);
    }

    #[test]
    fn uvarint_round_numbers() {
        let mut buf = Vec::new();
        encode_uvarint(&mut buf, 0);
        assert_eq!(buf, vec![0]);
        buf.clear();
        encode_uvarint(&mut buf, 127);
        assert_eq!(buf, vec![0x7f]);
        buf.clear();
        encode_uvarint(&mut buf, 128);
        assert_eq!(buf, vec![0x80, 0x01]);
    }

    proptest! {
        // Distinct datums must produce distinct encodings, and equal
        // datums equal encodings, or partition boundary comparison
        // would be meaningless. Strings and byte arrays with identical
        // contents share an encoding deliberately, so compare within a
        // kind only.
        #[test]
        fn encoding_is_injective(a in arb_datum(), b in arb_datum()) {
            let mut ea = Vec::new();
            let mut eb = Vec::new();
            encode_datum(&mut ea, NO_COLUMN_ID, &a);
            encode_datum(&mut eb, NO_COLUMN_ID, &b);
            if a == b {
                prop_assert_eq!(&ea, &eb);
            } else {
                let cross_kind = matches!(
                    (&a, &b),
                    (Datum::String(_), Datum::Bytes(_)) | (Datum::Bytes(_), Datum::String(_))
                );
                if !cross_kind {
                    prop_assert_ne!(&ea, &eb);
                }
            }
        }
    }
}

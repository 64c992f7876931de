//! Batch decoding fuzzer.
//!
//! The first byte picks the `OPERATION` of the record, the rest is its
//! `SQL_REDO`. Tests that a failing record never fails the whole batch.

use honggfuzz::fuzz;
use logminer_redo::testing::test_decode_batch;

const OPERATIONS: [&str; 5] = ["INSERT", "UPDATE", "DELETE", "UNSUPPORTED", "DDL"];

fn main() {
    loop {
        fuzz!(|data: &[u8]| {
            if let Some((selector, rest)) = data.split_first() {
                if let Ok(sql) = core::str::from_utf8(rest) {
                    test_decode_batch(OPERATIONS[usize::from(*selector) % OPERATIONS.len()], sql);
                }
            }
        });
    }
}

//! Reconstruction fuzzer for arbitrary statement text.
//!
//! Tests that both reconstructors either succeed deterministically or fail
//! cleanly, whatever the input.

use honggfuzz::fuzz;
use logminer_redo::testing::test_reconstruct;

fn main() {
    loop {
        fuzz!(|data: &[u8]| {
            if let Ok(sql) = core::str::from_utf8(data) {
                test_reconstruct(sql);
            }
        });
    }
}

//! Helpers shared by the fuzz harness and the regression tests.
//!
//! This module is gated behind the `testing` feature.
//!
//! # Provided helpers
//!
//! - [`test_reconstruct`]: run arbitrary text through both reconstructors and
//!   check the properties every outcome must have
//! - [`test_decode_batch`]: run arbitrary text through the decoder as part of
//!   a batch and check the batch policy

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::decoder::{LogMinerDecoder, truncate_from_where};
use crate::reconstruct::{Options, StatementKind, reconstruct};
use crate::record::{
    Direction, ERROR_CONTENT_FIELD, ERROR_MESSAGE_TYPE, Message, MessageId, ParsedMessage,
};

/// Reconstruct `sql` as both statement kinds.
///
/// # Panics
///
/// Panics if reconstruction is not deterministic or if a successful
/// reconstruction produced a column without the configured prefix.
pub fn test_reconstruct(sql: &str) {
    let options = Options::default();
    for kind in [StatementKind::Insert, StatementKind::Update] {
        let first = reconstruct(kind, sql, &options);
        let second = reconstruct(kind, sql, &options);
        assert_eq!(first, second, "{kind:?} reconstruction of {sql:?} is not deterministic");

        if let Ok(columns) = first {
            for column in columns.keys() {
                assert!(
                    column.starts_with(&options.column_prefix),
                    "column {column:?} lacks the prefix"
                );
            }
        }
    }

    let truncated = truncate_from_where(sql);
    assert!(truncated.len() <= sql.len() + 1);
}

/// Decode `sql` as the `SQL_REDO` of an `operation` record, followed by a
/// well-formed `DELETE` record.
///
/// # Panics
///
/// Panics if the two-record batch fails as a whole, changes size or order,
/// or reports a warning without substituting an error record.
pub fn test_decode_batch(operation: &str, sql: &str) {
    let decoder = LogMinerDecoder::default();
    let batch = vec![record(1, operation, sql), record(2, "DELETE", "")];
    let mut warnings: Vec<String> = Vec::new();

    let output = decoder
        .decode(batch, &mut warnings)
        .expect("a batch of two records never fails as a whole");
    assert_eq!(output.len(), 2);
    assert_eq!(output[0].id().sequence, 1);
    assert_eq!(output[1].id().sequence, 2);

    let first = output[0].as_parsed().expect("decoded records stay parsed");
    let failed = first.message_type == ERROR_MESSAGE_TYPE;
    assert_eq!(failed, !warnings.is_empty());
    if failed {
        assert!(first.body.contains_key(ERROR_CONTENT_FIELD));
    }
    assert_ne!(
        output[1].as_parsed().map(|message| message.message_type.as_str()),
        Some(ERROR_MESSAGE_TYPE)
    );
}

fn record(sequence: i64, operation: &str, sql: &str) -> Message {
    ParsedMessage::new(MessageId::new("fuzz", Direction::Incoming, sequence), "Row")
        .with_field("OPERATION", operation)
        .with_field("SQL_REDO", sql)
        .with_field("ROW_ID", "AAAR")
        .with_field("TIMESTAMP", "2024-01-01 00:00:00")
        .with_field("TABLE_NAME", "T")
        .into()
}

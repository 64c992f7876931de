//! Batch decoding of LogMiner records.
//!
//! [`LogMinerDecoder::decode`] turns every appropriate parsed message of a
//! batch into a new message whose body holds the reconstructed columns of
//! its `SQL_REDO` statement, plus the configured save-columns. Other
//! messages pass through untouched.
//!
//! A record that cannot be decoded fails alone: it is replaced by an error
//! record and a warning is reported, unless it is the only record of the
//! batch, in which case the error is returned to the caller.

use alloc::borrow::Cow;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::str::FromStr;

use crate::config::Configuration;
use crate::errors::Error;
use crate::reconstruct::{Columns, Options, reconstruct_insert, reconstruct_update};
use crate::record::{
    AGGREGATED_PROTOCOL, ERROR_CONTENT_FIELD, ERROR_MESSAGE_TYPE, Message, OPERATION_FIELD,
    PROTOCOLS, ParsedMessage, REQUIRED_FIELDS, SQL_REDO_FIELD, UNSUPPORTED_OPERATION,
};
use crate::value::Value;

/// Receiver of the non-fatal problems met while decoding a batch.
pub trait ReportingContext {
    /// Report one problem.
    fn warning(&mut self, message: &str);

    /// Report several problems, in order.
    fn warnings<'m, I>(&mut self, messages: I)
    where
        Self: Sized,
        I: IntoIterator<Item = &'m str>,
    {
        for message in messages {
            self.warning(message);
        }
    }
}

impl ReportingContext for Vec<String> {
    fn warning(&mut self, message: &str) {
        self.push(message.into());
    }
}

/// Kind of row change recorded in the `OPERATION` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// A row was inserted.
    Insert,
    /// A row was updated.
    Update,
    /// A row was deleted.
    Delete,
    /// LogMiner could not express the change as SQL.
    Unsupported,
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(operation: &str) -> Result<Self, Self::Err> {
        match operation {
            "INSERT" => Ok(Operation::Insert),
            "UPDATE" => Ok(Operation::Update),
            "DELETE" => Ok(Operation::Delete),
            UNSUPPORTED_OPERATION => Ok(Operation::Unsupported),
            other => Err(Error::UnsupportedOperation(other.into())),
        }
    }
}

/// Outcome of one message, before the batch policy is applied.
enum Decoded {
    Skipped(Message),
    Transformed(ParsedMessage),
    Failed { source: ParsedMessage, error: Error },
}

/// Decoder of LogMiner `SQL_REDO` records.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogMinerDecoder {
    config: Configuration,
    options: Options,
}

impl LogMinerDecoder {
    /// Create a decoder with the given configuration.
    #[must_use]
    pub fn new(config: Configuration) -> Self {
        let options = Options::from(&config);
        Self { config, options }
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Decode a batch, preserving its order and size.
    ///
    /// # Errors
    ///
    /// Returns the error of a record that cannot be decoded when it is the
    /// only record of the batch. In larger batches failures are reported to
    /// `context` and replaced by error records instead.
    #[tracing::instrument(level = "debug", skip_all, fields(messages = batch.len()))]
    pub fn decode<C>(&self, batch: Vec<Message>, context: &mut C) -> Result<Vec<Message>, Error>
    where
        C: ReportingContext + ?Sized,
    {
        let single = batch.len() == 1;
        let decoded: Vec<Decoded> = batch.into_iter().map(|message| self.decode_one(message)).collect();

        let mut output = Vec::with_capacity(decoded.len());
        for outcome in decoded {
            match outcome {
                Decoded::Skipped(message) => output.push(message),
                Decoded::Transformed(message) => output.push(message.into()),
                Decoded::Failed { error, .. } if single => return Err(error),
                Decoded::Failed { source, error } => {
                    let summary = first_line(&error);
                    let warning = format!("Message {} transformation failure: {summary}", source.id);
                    tracing::warn!("{warning}");
                    context.warning(&warning);
                    output.push(self.error_message(&source, summary).into());
                }
            }
        }
        Ok(output)
    }

    /// Decode a single parsed message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFields`] if a required field is absent,
    /// [`Error::UnsupportedOperation`] for an unknown `OPERATION`, and the
    /// parsing or reconstruction error of the `SQL_REDO` statement.
    pub fn decode_message(&self, message: &ParsedMessage) -> Result<ParsedMessage, Error> {
        let columns = self.reconstruct(message)?;
        let mut decoded = message.without_body();
        decoded.protocol = AGGREGATED_PROTOCOL.into();
        decoded.body.extend(columns);
        self.save_columns(message, &mut decoded);
        Ok(decoded)
    }

    fn decode_one(&self, message: Message) -> Decoded {
        let source = match message {
            Message::Parsed(parsed) if is_appropriate(&parsed) => parsed,
            other => {
                tracing::debug!(
                    message_id = %other.id(),
                    protocol = other.protocol(),
                    "Skip message"
                );
                return Decoded::Skipped(other);
            }
        };

        tracing::debug!(message_id = %source.id, "Begin process message");
        match self.decode_message(&source) {
            Ok(decoded) => Decoded::Transformed(decoded),
            Err(error) => {
                tracing::error!(message_id = %source.id, %error, "Message transformation failure");
                Decoded::Failed { source, error }
            }
        }
    }

    fn reconstruct(&self, message: &ParsedMessage) -> Result<Columns, Error> {
        let missing: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|field| !message.body.contains_key(**field))
            .map(|field| (*field).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingFields(missing));
        }

        let operation = field_text(message, OPERATION_FIELD);
        let sql = field_text(message, SQL_REDO_FIELD);
        match operation.parse::<Operation>()? {
            Operation::Insert => reconstruct_insert(&sql, &self.options),
            Operation::Update if self.config.truncate_update_query_from_where_clause => {
                reconstruct_update(&truncate_from_where(&sql), &self.options)
            }
            Operation::Update => reconstruct_update(&sql, &self.options),
            Operation::Delete | Operation::Unsupported => Ok(Columns::default()),
        }
    }

    fn error_message(&self, source: &ParsedMessage, content: String) -> ParsedMessage {
        let mut message = source.without_body();
        message.message_type = ERROR_MESSAGE_TYPE.into();
        message.protocol = AGGREGATED_PROTOCOL.into();
        message
            .body
            .insert(ERROR_CONTENT_FIELD.into(), Value::Text(content));
        self.save_columns(source, &mut message);
        message
    }

    fn save_columns(&self, source: &ParsedMessage, target: &mut ParsedMessage) {
        for column in &self.config.save_columns {
            if let Some(value) = source.body.get(column) {
                target.body.insert(column.clone(), value.clone());
            }
        }
    }
}

/// Cut a statement at the first `WHERE`, matched case-insensitively, and
/// terminate it with `;`. Statements without `WHERE` are returned as is.
///
/// ```
/// use logminer_redo::decoder::truncate_from_where;
///
/// assert_eq!(truncate_from_where("abc WHERE cde"), "abc ;");
/// assert_eq!(truncate_from_where("abc"), "abc");
/// ```
#[must_use]
pub fn truncate_from_where(sql: &str) -> Cow<'_, str> {
    const WHERE: &[u8] = b"WHERE";

    let position = sql
        .as_bytes()
        .windows(WHERE.len())
        .position(|window| window.eq_ignore_ascii_case(WHERE));
    match position.and_then(|position| sql.get(..position)) {
        Some(head) => Cow::Owned(format!("{head};")),
        None => Cow::Borrowed(sql),
    }
}

/// Whether the protocol is blank or one of [`PROTOCOLS`].
fn is_appropriate(message: &ParsedMessage) -> bool {
    let protocol = message.protocol.trim();
    protocol.is_empty() || PROTOCOLS.contains(&protocol)
}

/// Text of a field known to be present.
fn field_text<'m>(message: &'m ParsedMessage, field: &str) -> Cow<'m, str> {
    match message.body.get(field) {
        Some(Value::Text(text)) => Cow::Borrowed(text),
        Some(other) => Cow::Owned(other.to_string()),
        None => Cow::Borrowed(""),
    }
}

fn first_line(error: &Error) -> String {
    error
        .to_string()
        .lines()
        .next()
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Direction, MessageId, RawMessage};
    use alloc::vec;

    fn row(sequence: i64, operation: &str, sql: &str) -> ParsedMessage {
        ParsedMessage::new(MessageId::new("oracle", Direction::Incoming, sequence), "Row")
            .with_protocol("csv")
            .with_field("OPERATION", operation)
            .with_field("SQL_REDO", sql)
            .with_field("ROW_ID", "AAAR")
            .with_field("TIMESTAMP", "2024-01-01 00:00:00")
            .with_field("TABLE_NAME", "EMP")
    }

    #[test]
    fn test_truncate_from_where() {
        assert_eq!(truncate_from_where("abc WHERE cde"), "abc ;");
        assert_eq!(truncate_from_where("abc where cde WHERE x"), "abc ;");
        assert_eq!(truncate_from_where("abc"), "abc");
        assert!(matches!(truncate_from_where("abc"), Cow::Borrowed(_)));
        assert_eq!(truncate_from_where("é WhErE x"), "é ;");
    }

    #[test]
    fn test_operation_from_str() {
        assert_eq!("INSERT".parse::<Operation>(), Ok(Operation::Insert));
        assert_eq!("UNSUPPORTED".parse::<Operation>(), Ok(Operation::Unsupported));
        assert_eq!(
            "insert".parse::<Operation>(),
            Err(Error::UnsupportedOperation("insert".into()))
        );
    }

    #[test]
    fn test_is_appropriate() {
        assert!(is_appropriate(&row(1, "DELETE", "")));
        assert!(is_appropriate(&row(1, "DELETE", "").with_protocol(" ")));
        assert!(is_appropriate(
            &row(1, "DELETE", "").with_protocol("oracle-log-miner")
        ));
        assert!(!is_appropriate(&row(1, "DELETE", "").with_protocol("fix")));
    }

    #[test]
    fn test_raw_messages_pass_through() {
        let decoder = LogMinerDecoder::default();
        let raw = Message::from(RawMessage {
            protocol: "csv".into(),
            body: vec![1, 2, 3],
            ..RawMessage::default()
        });
        let mut warnings: Vec<String> = Vec::new();
        let output = decoder.decode(vec![raw.clone()], &mut warnings).unwrap();
        assert_eq!(output, vec![raw]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_decode_message_keeps_identity() {
        let decoder = LogMinerDecoder::default();
        let mut source = row(
            7,
            "INSERT",
            r#"insert into "HR"."EMP"("ID","NAME") values ('1','Alice');"#,
        );
        source.event_id = Some("event".into());
        let decoded = decoder.decode_message(&source).unwrap();
        assert_eq!(decoded.id, source.id);
        assert_eq!(decoded.event_id, source.event_id);
        assert_eq!(decoded.message_type, "Row");
        assert_eq!(decoded.protocol, AGGREGATED_PROTOCOL);
        let keys: Vec<&str> = decoded.body.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "th2_ID",
                "th2_NAME",
                "OPERATION",
                "SQL_REDO",
                "ROW_ID",
                "TIMESTAMP",
                "TABLE_NAME"
            ]
        );
    }

    #[test]
    fn test_update_without_truncation_still_ignores_where() {
        let config = Configuration {
            truncate_update_query_from_where_clause: false,
            ..Configuration::default()
        };
        let decoder = LogMinerDecoder::new(config);
        let source = row(
            1,
            "UPDATE",
            r#"update "HR"."EMP" set "NAME" = 'Bob' where "NAME" = 'Alice';"#,
        );
        let decoded = decoder.decode_message(&source).unwrap();
        assert_eq!(decoded.body.get("th2_NAME"), Some(&Value::from("Bob")));
    }

    #[test]
    fn test_missing_fields() {
        let decoder = LogMinerDecoder::default();
        let mut source = row(1, "DELETE", "");
        source.body.shift_remove("ROW_ID");
        source.body.shift_remove("TABLE_NAME");
        assert_eq!(
            decoder.decode_message(&source),
            Err(Error::MissingFields(vec!["ROW_ID".into(), "TABLE_NAME".into()]))
        );
    }

    #[test]
    fn test_warning_names_the_message() {
        let decoder = LogMinerDecoder::default();
        let batch = vec![
            Message::from(row(1, "DDL", "")),
            Message::from(row(2, "DELETE", "")),
        ];
        let mut warnings: Vec<String> = Vec::new();
        let output = decoder.decode(batch, &mut warnings).unwrap();
        assert_eq!(output.len(), 2);
        assert_eq!(
            warnings,
            ["Message oracle:incoming:1 transformation failure: Unsupported operation kind 'DDL'"]
        );
    }

    #[test]
    fn test_reporting_context_batch() {
        let mut warnings: Vec<String> = Vec::new();
        warnings.warnings(["a", "b"]);
        assert_eq!(warnings, ["a", "b"]);
    }
}

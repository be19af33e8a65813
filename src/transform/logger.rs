//! Log transformer
//!
//! Identity pass-through that prints every row it sees, to watch what flows
//! through a pipeline at some point.

use super::Condition;
use crate::etl::{Channel, Emit, Output, Transformer};
use crate::row::{FieldFilter, Row, type_name};
use eyre::{Context, Result};
use owo_colors::{OwoColorize, Stream, Style};
use serde_json::Value;
use std::borrow::Cow;
use std::io::Write;
use std::sync::Arc;

const DEFAULT_WIDTH: usize = 80;
const DOT: char = '·';

/// What the Log transform shows
#[derive(Clone, Default)]
pub struct LogConfig {
    /// Restrict which keys are displayed (all keys when `None`)
    pub field_filter: Option<FieldFilter>,
    /// Only display rows satisfying this predicate (every row when `None`)
    pub condition: Option<Condition>,
}

impl LogConfig {
    pub fn fields(mut self, filter: FieldFilter) -> Self {
        self.field_filter = Some(filter);
        self
    }

    pub fn when(mut self, condition: impl Fn(&Row) -> bool + Send + Sync + 'static) -> Self {
        self.condition = Some(Arc::new(condition));
        self
    }
}

/// Something the Log transform can format
pub enum Loggable<'a> {
    Row(&'a Row),
    Text(&'a str),
}

/// Pass-through transformer printing one section per row
///
/// Each section is labelled with a line counter that starts at 1 and grows
/// for every row received, displayed or not. Rows always pass through
/// unchanged, whatever the condition says.
///
/// Output goes to stderr unless another writer is supplied. Separators are
/// shaded only when stderr supports colours.
///
/// # Example
/// ```
/// use rowpipe::testing::SharedBuffer;
/// use rowpipe::transform::{Log, LogConfig};
/// use rowpipe::etl::Transformer;
/// use rowpipe::row;
///
/// let buffer = SharedBuffer::new();
/// let mut log = Log::new(LogConfig::default()).with_writer(buffer.clone());
/// let out = log.transform_many(vec![row! { "id" => 7 }]).unwrap();
///
/// assert_eq!(out, vec![row! { "id" => 7 }]);
/// assert!(buffer.contents().contains("id:int → «7»"));
/// ```
pub struct Log {
    config: LogConfig,
    lineno: usize,
    writer: Box<dyn Write + Send>,
    color: bool,
    width: usize,
}

impl Log {
    pub fn new(config: LogConfig) -> Self {
        Self {
            config,
            lineno: 0,
            writer: Box::new(std::io::stderr()),
            color: true,
            width: DEFAULT_WIDTH,
        }
    }

    /// Write sections to `writer`, without colours
    pub fn with_writer(mut self, writer: impl Write + Send + 'static) -> Self {
        self.writer = Box::new(writer);
        self.color = false;
        self
    }

    /// Shade separators, as far as stderr supports colours
    pub fn colored(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Rows received so far in this run
    pub fn lineno(&self) -> usize {
        self.lineno
    }

    fn shade(&self, s: &str) -> String {
        if self.color {
            let style = Style::new().bright_black().bold();
            s.if_supports_color(Stream::Stderr, |text| text.style(style))
                .to_string()
        } else {
            s.to_string()
        }
    }

    fn rule(&self, label: Option<&str>) -> String {
        let dots = |n: usize| DOT.to_string().repeat(n);
        match label {
            Some(label) => {
                let tail = self
                    .width
                    .saturating_sub(6 + label.chars().count())
                    .saturating_sub(1);
                format!(
                    "{}{}{}{}{}",
                    self.shade(&dots(4)),
                    self.shade("{"),
                    label,
                    self.shade("}"),
                    self.shade(&dots(tail))
                )
            }
            None => self.shade(&dots(self.width.saturating_sub(1))),
        }
    }

    /// Format a row as a field listing, or free text line by line
    ///
    /// A single blank line formats to an empty string.
    pub fn format(&self, item: Loggable<'_>) -> String {
        let lines: Vec<String> = match item {
            Loggable::Row(row) => row
                .iter()
                .map(|(key, value)| {
                    let shown = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    format!(
                        "  {}{}{} {} {}{}{}",
                        key,
                        self.shade(":"),
                        type_name(value),
                        self.shade("→"),
                        self.shade("«"),
                        shown,
                        self.shade("»")
                    )
                })
                .collect(),
            Loggable::Text(text) => text.split('\n').map(str::to_string).collect(),
        };

        if lines.len() < 2 && lines.first().is_none_or(|l| l.trim().is_empty()) {
            return String::new();
        }
        lines.join("\n")
    }

    fn write_section(&mut self, label: &str, body: &str) -> Result<()> {
        let section = format!("{}\n{}\n{}\n\n", self.rule(Some(label)), body, self.rule(None));
        self.writer
            .write_all(section.as_bytes())
            .and_then(|()| self.writer.flush())
            .context("Failed to write log output")
    }

    /// Display free text in a section of its own
    ///
    /// # Errors
    /// Returns an error if the writer fails
    pub fn write_text(&mut self, label: &str, text: &str) -> Result<()> {
        let body = self.format(Loggable::Text(text));
        self.write_section(label, &body)
    }

    fn display(&mut self, row: &Row) -> Result<()> {
        let shown = match &self.config.field_filter {
            Some(filter) => Cow::Owned(row.restrict(filter)),
            None => Cow::Borrowed(row),
        };
        let body = self.format(Loggable::Row(&shown));
        let label = self.lineno.to_string();
        self.write_section(&label, &body)
    }
}

impl Transformer for Log {
    fn name(&self) -> &str {
        "log"
    }

    fn initialize(&mut self) -> Result<()> {
        self.lineno = 0;
        Ok(())
    }

    fn transform(&mut self, row: Row, _channel: &Channel) -> Output<'_> {
        Box::new(std::iter::once_with(move || -> Result<Emit> {
            self.lineno += 1;
            let shown = self.config.condition.as_ref().is_none_or(|cond| cond(&row));
            if shown {
                self.display(&row)?;
            }
            Ok(Emit::main(row))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;
    use crate::testing::SharedBuffer;
    use serde_json::json;

    fn log_into(config: LogConfig) -> (Log, SharedBuffer) {
        let buffer = SharedBuffer::new();
        (Log::new(config).with_writer(buffer.clone()), buffer)
    }

    #[test]
    fn test_passes_rows_through_unchanged() {
        let (mut log, _) = log_into(LogConfig::default());
        let rows = vec![
            row! { "id" => 1, "_raw" => "x" },
            row! { "nested" => json!({"a": [1, 2]}) },
        ];
        let out = log.transform_many(rows.clone()).unwrap();
        assert_eq!(out.len(), 2);
        for (a, b) in out.iter().zip(&rows) {
            assert_eq!(a.as_map(), b.as_map());
        }
    }

    #[test]
    fn test_sections_are_labelled_by_counter() {
        let (mut log, buffer) = log_into(LogConfig::default());
        log.initialize().unwrap();
        log.transform_many(vec![row! { "a" => 1 }, row! { "a" => 2 }])
            .unwrap();

        let output = buffer.contents();
        assert!(output.contains("····{1}·"));
        assert!(output.contains("····{2}·"));
        assert_eq!(log.lineno(), 2);
    }

    #[test]
    fn test_condition_hides_rows_but_counts_them() {
        let config = LogConfig::default().when(|row| row.contains("show"));
        let (mut log, buffer) = log_into(config);
        let out = log
            .transform_many(vec![row! { "hide" => 1 }, row! { "show" => 2 }])
            .unwrap();

        assert_eq!(out.len(), 2);
        let output = buffer.contents();
        assert!(!output.contains("{1}"));
        assert!(output.contains("{2}"));
        assert!(!output.contains("hide"));
    }

    #[test]
    fn test_field_filter_restricts_display_only() {
        let config = LogConfig::default().fields(FieldFilter::keys(["id"]));
        let (mut log, buffer) = log_into(config);
        let out = log
            .transform_many(vec![row! { "id" => 7, "secret" => "s" }])
            .unwrap();

        assert!(out[0].contains("secret"));
        let output = buffer.contents();
        assert!(output.contains("  id:int → «7»"));
        assert!(!output.contains("secret"));
    }

    #[test]
    fn test_format_field_listing() {
        let log = Log::new(LogConfig::default()).colored(false);
        let row = row! { "name" => "Ada", "ok" => true, "n" => Value::Null };
        assert_eq!(
            log.format(Loggable::Row(&row)),
            "  name:str → «Ada»\n  ok:bool → «true»\n  n:null → «null»"
        );
    }

    #[test]
    fn test_format_text() {
        let log = Log::new(LogConfig::default()).colored(false);
        assert_eq!(log.format(Loggable::Text("a\nb")), "a\nb");
        assert_eq!(log.format(Loggable::Text("   ")), "");
    }

    #[test]
    fn test_write_text_section() {
        let (mut log, buffer) = log_into(LogConfig::default());
        log.write_text("note", "first\nsecond").unwrap();
        let output = buffer.contents();
        assert!(output.starts_with("····{note}·"));
        assert!(output.contains("first\nsecond\n"));
    }

    #[test]
    fn test_rule_width() {
        let log = Log::new(LogConfig::default()).colored(false).width(20);
        let labelled = log.rule(Some("12"));
        assert_eq!(labelled, "····{12}···········");
        assert_eq!(labelled.chars().count(), 19);
        assert_eq!(log.rule(None).chars().count(), 19);
    }

    #[test]
    fn test_output_is_produced_lazily() {
        let (mut log, buffer) = log_into(LogConfig::default());
        let channel = Channel::main();
        let output = log.transform(row! { "a" => 1 }, &channel);
        assert!(buffer.contents().is_empty());
        let emitted: Vec<_> = output.collect();
        assert_eq!(emitted.len(), 1);
        assert!(!buffer.contents().is_empty());
    }

    #[test]
    fn test_no_escape_codes_without_colour_support() {
        owo_colors::set_override(false);
        let log = Log::new(LogConfig::default());
        let section = log.format(Loggable::Row(&row! { "id" => 1 }));
        let rule = log.rule(Some("1"));
        owo_colors::unset_override();

        assert_eq!(section, "  id:int → «1»");
        assert!(!rule.contains('\x1b'));
    }
}

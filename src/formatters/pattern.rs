//! Pattern-driven text formatter
//!
//! The template is compiled once into a sequence of render steps; `format`
//! replays the steps against each event. Parsing never fails: unknown
//! directives and dangling modifiers degrade to literal text.

use crate::core::event::LogEvent;
use crate::formatters::Formatter;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, Utc};
use std::cell::RefCell;
use std::fmt::Write as _;
use std::sync::Arc;

/// Pattern used when none is supplied.
pub const DEFAULT_PATTERN: &str = "%d{%Y-%m-%d %H:%M:%S}.%ms [%t] %-5p %c - %m%n";

/// Sub-format for `%d` when no `{...}` is given.
const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Widths beyond this are clamped; it keeps a typo like `%-50000p` from
/// allocating pathological padding.
const MAX_WIDTH: usize = 1024;

/// Width and alignment modifier, applied after a directive renders its raw
/// text. Padding never truncates; the fill is always a space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct FormatOptions {
    width: usize,
    left_align: bool,
}

impl FormatOptions {
    fn write(&self, text: &str, out: &mut String) {
        let len = text.chars().count();
        if self.width <= len {
            out.push_str(text);
            return;
        }
        let pad = self.width - len;
        if self.left_align {
            out.push_str(text);
            out.extend(std::iter::repeat(' ').take(pad));
        } else {
            out.extend(std::iter::repeat(' ').take(pad));
            out.push_str(text);
        }
    }
}

/// One compiled render step.
#[derive(Debug, Clone)]
enum Step {
    Literal(String),
    Message(FormatOptions),
    Level(FormatOptions),
    LoggerName(FormatOptions),
    ThreadId(FormatOptions),
    /// Falls back to the thread id when the thread has no name.
    ThreadName(FormatOptions),
    DateTime {
        format: String,
        options: FormatOptions,
    },
    Milliseconds(FormatOptions),
    ShortFile(FormatOptions),
    Function(FormatOptions),
    Line(FormatOptions),
    Location(FormatOptions),
    Newline,
    Tab,
}

impl Step {
    /// Build a `%d` step. A sub-format chrono cannot interpret is replaced
    /// with the default one here, so rendering cannot fail later.
    fn date_time(format: String, options: FormatOptions) -> Self {
        let invalid = StrftimeItems::new(&format).any(|item| matches!(item, Item::Error));
        let format = if invalid {
            DEFAULT_DATE_FORMAT.to_string()
        } else {
            format
        };
        Step::DateTime { format, options }
    }

    fn render(&self, event: &LogEvent, out: &mut String) {
        match self {
            Step::Literal(text) => out.push_str(text),
            Step::Newline => out.push('\n'),
            Step::Tab => out.push('\t'),
            Step::Message(opts) => opts.write(event.message(), out),
            Step::Level(opts) => opts.write(event.level.as_str(), out),
            Step::LoggerName(opts) => opts.write(&event.logger_name, out),
            Step::ThreadId(opts) => opts.write(&event.thread_id.to_string(), out),
            Step::ThreadName(opts) => match &event.thread_name {
                Some(name) => opts.write(name, out),
                None => opts.write(&event.thread_id.to_string(), out),
            },
            Step::Milliseconds(opts) => {
                opts.write(&format!("{:03}", event.milliseconds().min(999)), out);
            }
            Step::ShortFile(opts) => opts.write(event.location.short_file(), out),
            Step::Function(opts) => opts.write(event.location.function, out),
            Step::Line(opts) => opts.write(&event.location.line.to_string(), out),
            Step::Location(opts) => opts.write(&event.location.to_string(), out),
            Step::DateTime { format, options } => {
                render_seconds_cached(&event.timestamp, format, |text| {
                    options.write(text, out);
                });
            }
        }
    }
}

// Thread-local cache of the last second's rendered timestamp; events logged
// within the same second reuse it instead of re-running strftime.
thread_local! {
    static DATE_CACHE: RefCell<DateCache> = const {
        RefCell::new(DateCache {
            second: i64::MIN,
            format: String::new(),
            rendered: String::new(),
        })
    };
}

struct DateCache {
    second: i64,
    format: String,
    rendered: String,
}

fn render_seconds_cached(timestamp: &DateTime<Utc>, format: &str, sink: impl FnOnce(&str)) {
    let second = timestamp.timestamp();
    DATE_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        if cache.second != second || cache.format != format {
            cache.rendered.clear();
            // Validated at parse time, so this write cannot fail; an empty
            // rendering is the harmless fallback if it somehow does.
            let local = timestamp.with_timezone(&Local);
            if write!(cache.rendered, "{}", local.format(format)).is_err() {
                cache.rendered.clear();
            }
            cache.second = second;
            cache.format.clear();
            cache.format.push_str(format);
        }
        sink(&cache.rendered);
    });
}

/// Compiles a printf-style template and renders events against it.
///
/// Directives: `%d{strftime}` timestamp (local time, default
/// `%Y-%m-%d %H:%M:%S`), `%ms` three-digit milliseconds, `%p` level, `%c`
/// logger name, `%t` thread id, `%T` thread name, `%F` file name, `%f`
/// function, `%L` line, `%l` full call site, `%m` message, `%n` newline,
/// `%%` literal percent. A `-` flag and a digit width between `%` and the
/// directive left-align or right-align the rendered text, space-padded,
/// never truncating: `%-5p` renders `INFO `.
pub struct PatternFormatter {
    pattern: String,
    steps: Vec<Step>,
}

impl PatternFormatter {
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let steps = parse(&pattern);
        Self { pattern, steps }
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Replace the template; the new one is compiled immediately.
    pub fn set_pattern(&mut self, pattern: impl Into<String>) {
        self.pattern = pattern.into();
        self.steps = parse(&self.pattern);
    }
}

impl Default for PatternFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERN)
    }
}

impl Formatter for PatternFormatter {
    fn format(&self, event: &LogEvent) -> String {
        let mut out = String::with_capacity(self.pattern.len() + event.message().len() + 32);
        for step in &self.steps {
            step.render(event, &mut out);
        }
        out
    }

    fn clone_formatter(&self) -> Arc<dyn Formatter> {
        Arc::new(Self {
            pattern: self.pattern.clone(),
            steps: self.steps.clone(),
        })
    }
}

fn parse(pattern: &str) -> Vec<Step> {
    let chars: Vec<char> = pattern.chars().collect();
    let len = chars.len();
    let mut steps = Vec::new();
    let mut pos = 0;

    while pos < len {
        if chars[pos] != '%' {
            let start = pos;
            while pos < len && chars[pos] != '%' {
                pos += 1;
            }
            steps.push(Step::Literal(chars[start..pos].iter().collect()));
            continue;
        }

        if pos + 1 >= len {
            // Lone trailing '%'.
            steps.push(Step::Literal("%".to_string()));
            break;
        }

        let mut options = FormatOptions::default();
        pos += 1;
        let mut next = chars[pos];

        if next == '-' {
            options.left_align = true;
            if pos + 1 >= len {
                // Dangling alignment flag, dropped.
                break;
            }
            pos += 1;
            next = chars[pos];
        }

        if next.is_ascii_digit() {
            let mut width = 0usize;
            while pos < len && chars[pos].is_ascii_digit() {
                let digit = chars[pos] as usize - '0' as usize;
                width = width.saturating_mul(10).saturating_add(digit);
                pos += 1;
            }
            options.width = width.min(MAX_WIDTH);
            if pos >= len {
                // Dangling width, dropped.
                break;
            }
            next = chars[pos];
        }

        match next {
            'd' => {
                if pos + 1 < len && chars[pos + 1] == '{' {
                    match chars[pos + 2..].iter().position(|&c| c == '}') {
                        Some(rel) => {
                            let end = pos + 2 + rel;
                            let format: String = chars[pos + 2..end].iter().collect();
                            steps.push(Step::date_time(format, options));
                            pos = end + 1;
                        }
                        None => {
                            // Unterminated brace: default format, and the
                            // '{...' tail is re-parsed as ordinary text.
                            steps.push(Step::date_time(
                                DEFAULT_DATE_FORMAT.to_string(),
                                options,
                            ));
                            pos += 1;
                        }
                    }
                } else {
                    steps.push(Step::date_time(DEFAULT_DATE_FORMAT.to_string(), options));
                    pos += 1;
                }
            }
            'm' => {
                if pos + 1 < len && chars[pos + 1] == 's' {
                    steps.push(Step::Milliseconds(options));
                    pos += 2;
                } else {
                    steps.push(Step::Message(options));
                    pos += 1;
                }
            }
            'p' => {
                steps.push(Step::Level(options));
                pos += 1;
            }
            'c' => {
                steps.push(Step::LoggerName(options));
                pos += 1;
            }
            't' => {
                steps.push(Step::ThreadId(options));
                pos += 1;
            }
            'T' => {
                steps.push(Step::ThreadName(options));
                pos += 1;
            }
            'F' => {
                steps.push(Step::ShortFile(options));
                pos += 1;
            }
            'f' => {
                steps.push(Step::Function(options));
                pos += 1;
            }
            'L' => {
                steps.push(Step::Line(options));
                pos += 1;
            }
            'l' => {
                steps.push(Step::Location(options));
                pos += 1;
            }
            'n' => {
                steps.push(Step::Newline);
                pos += 1;
            }
            '\t' => {
                steps.push(Step::Tab);
                pos += 1;
            }
            '%' => {
                steps.push(Step::Literal("%".to_string()));
                pos += 1;
            }
            other => {
                // Unknown directive degrades to literal text.
                let mut text = String::from('%');
                text.push(other);
                steps.push(Step::Literal(text));
                pos += 1;
            }
        }
    }

    steps
}

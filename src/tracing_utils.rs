use nu_ansi_term::{Color, Style};
use std::{fmt, thread};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::registry::LookupSpan;

/// One line per event: `[LEVEL] thread span:span: fields`.
///
/// Colour follows the writer, so `with_ansi(false)` on the subscriber builder
/// turns it off for the prefix and the fields alike.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineFormatter;

fn level_paint(level: &Level, ansi: bool) -> String {
    if !ansi {
        return level.to_string();
    }
    let color = match *level {
        Level::ERROR => Color::Red,
        Level::WARN => Color::Yellow,
        Level::INFO => Color::Green,
        Level::DEBUG => Color::Blue,
        Level::TRACE => Color::Purple,
    };
    color.paint(level.as_str()).to_string()
}

fn style_paint(style: Style, text: &str, ansi: bool) -> String {
    if ansi {
        style.paint(text).to_string()
    } else {
        text.to_owned()
    }
}

impl<S, N> FormatEvent<S, N> for LineFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let ansi = writer.has_ansi_escapes();

        let spans = ctx
            .event_scope()
            .map(|scope| {
                scope
                    .from_root()
                    .map(|span| span.name())
                    .collect::<Vec<_>>()
                    .join(":")
            })
            .unwrap_or_default();

        write!(
            &mut writer,
            "[{}]\t{} {}: ",
            level_paint(metadata.level(), ansi),
            style_paint(
                Style::new().bold(),
                thread::current().name().unwrap_or_default(),
                ansi,
            ),
            style_paint(Color::Fixed(12).normal(), &spans, ansi),
        )?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

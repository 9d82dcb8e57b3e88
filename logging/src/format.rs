//! Line format matching `LogEvent::toString`: level, timestamp, pid:tid, and — when a
//! call is currently being dispatched on this thread — the call's msg-id and method
//! name, sourced from [`rpc::runtime`].

use std::fmt;

use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

pub struct RapidFormat;

impl<S, N> FormatEvent<S, N> for RapidFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(&self, ctx: &FmtContext<'_, S, N>, mut writer: Writer<'_>, event: &Event<'_>) -> fmt::Result {
        let metadata = event.metadata();
        let now = chrono::Local::now();

        write!(
            writer,
            "[{}]\t[{}]\t[{}:{:?}]\t",
            metadata.level(),
            now.format("%y-%m-%d %H:%M:%S%.3f"),
            std::process::id(),
            std::thread::current().id(),
        )?;

        let msg_id = rpc::runtime::current_msg_id();
        let method_name = rpc::runtime::current_method_name();
        if !msg_id.is_empty() && !method_name.is_empty() {
            write!(writer, "[{msg_id}:{method_name}]\t")?;
        }

        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

use std::io::{BufRead, Read, Write};
use std::sync::Arc;

use serde_json::Value;

use crate::coordinator::{Coordinator, StaticPage};
use crate::protocol::{Envelope, Reply, TabEvent, TabId};

/// Largest accepted envelope; serialized pages can be big but not unbounded.
const MAX_LINE_LEN: usize = 8 * 1024 * 1024;

/// Run the coordinator over line-delimited JSON.
///
/// Reads one envelope per line from `input` and writes one reply per line to
/// `output`. Returns 0 on EOF after in-flight escalations finish, 1 when
/// either side of the pipe breaks.
pub fn run(coordinator: &Coordinator, mut input: impl BufRead, mut output: impl Write) -> i32 {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = (&mut input)
            .take(MAX_LINE_LEN as u64 + 1)
            .read_until(b'\n', &mut buf);
        match read {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::error!("stdin read error: {e}");
                coordinator.flush();
                return 1;
            }
        }

        let (tab, reply) = if buf.len() > MAX_LINE_LEN && !buf.ends_with(b"\n") {
            if let Err(e) = discard_line(&mut input) {
                tracing::error!("stdin read error: {e}");
                coordinator.flush();
                return 1;
            }
            tracing::warn!("message exceeds {MAX_LINE_LEN} bytes, dropping");
            (
                None,
                Reply::Error(format!("message too large: exceeds {MAX_LINE_LEN} byte limit")),
            )
        } else {
            match std::str::from_utf8(&buf).map(str::trim) {
                Ok("") => continue,
                Ok(line) => match Envelope::parse(line) {
                    Ok(envelope) => (Some(envelope.tab), dispatch(coordinator, envelope)),
                    Err(e) => {
                        tracing::warn!("malformed message: {e}");
                        (None, Reply::Error(format!("malformed message: {e}")))
                    }
                },
                Err(e) => {
                    tracing::warn!("message is not UTF-8: {e}");
                    (None, Reply::Error(format!("malformed message: {e}")))
                }
            }
        };

        if !write_reply(&mut output, tab, &reply) {
            tracing::error!("output broken, exiting");
            coordinator.flush();
            return 1;
        }
    }

    coordinator.flush();
    0
}

/// Skip the rest of an oversized line without buffering it.
fn discard_line(input: &mut impl BufRead) -> std::io::Result<()> {
    loop {
        let (found, used) = {
            let available = input.fill_buf()?;
            if available.is_empty() {
                return Ok(());
            }
            match available.iter().position(|&b| b == b'\n') {
                Some(i) => (true, i + 1),
                None => (false, available.len()),
            }
        };
        input.consume(used);
        if found {
            return Ok(());
        }
    }
}

fn dispatch(coordinator: &Coordinator, envelope: Envelope) -> Reply {
    match envelope.event {
        TabEvent::Message(message) => coordinator.handle(envelope.tab, message),
        TabEvent::Attached(doc) => {
            coordinator.attach_page(envelope.tab, Arc::new(StaticPage(doc)));
            Reply::Ack
        }
        TabEvent::Closed => {
            coordinator.close_tab(envelope.tab);
            Reply::Ack
        }
    }
}

fn write_reply(output: &mut impl Write, tab: Option<TabId>, reply: &Reply) -> bool {
    let mut value = match serde_json::to_value(reply) {
        Ok(v) => v,
        Err(e) => Value::String(format!("internal serialization error: {e}")),
    };
    if let Value::Object(map) = &mut value {
        map.insert(
            "tab".to_string(),
            tab.map(|t| Value::from(t.0)).unwrap_or(Value::Null),
        );
    }
    writeln!(output, "{value}").is_ok() && output.flush().is_ok()
}

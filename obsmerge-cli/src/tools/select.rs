use anyhow::{Result, anyhow};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::io::Write;

/// Walk `document` one segment at a time. Objects are indexed by key and
/// arrays by a non-negative position.
pub fn select_path<'a, S: AsRef<str>>(document: &'a Value, path: &[S]) -> Result<&'a Value> {
    let mut current = document;
    for (depth, segment) in path.iter().enumerate() {
        let segment = segment.as_ref();
        let walked = || {
            path[..=depth]
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join(".")
        };
        current = match current {
            Value::Object(map) => map
                .get(segment)
                .ok_or_else(|| anyhow!("no key `{}` in document", walked()))?,
            Value::Array(items) => {
                let index: usize = segment
                    .parse()
                    .map_err(|_| anyhow!("`{}` is not an array index", walked()))?;
                items.get(index).ok_or_else(|| {
                    anyhow!("index `{}` out of range ({} items)", walked(), items.len())
                })?
            }
            _ => return Err(anyhow!("cannot descend into scalar at `{}`", walked())),
        };
    }
    Ok(current)
}

/// Pretty-print with four-space indentation and a trailing newline.
pub fn write_indented<W: Write>(out: &mut W, value: &Value) -> Result<()> {
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut *out, formatter);
    value.serialize(&mut serializer)?;
    writeln!(out)?;
    Ok(())
}

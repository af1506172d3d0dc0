use crate::error::Result;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::io::Write;

/// Write a JSON body to `out` followed by a newline.
///
/// With `pretty` the body is re-indented with two spaces, keeping the key
/// order. An empty body prints just the newline.
pub fn print_json<W: Write>(out: &mut W, body: &[u8], pretty: bool) -> Result<()> {
    if pretty && !body.iter().all(u8::is_ascii_whitespace) {
        let value: serde_json::Value = serde_json::from_slice(body)?;
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut *out, PrettyFormatter::with_indent(b"  "));
        value.serialize(&mut serializer)?;
    } else {
        out.write_all(body)?;
    }
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

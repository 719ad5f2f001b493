use std::io::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use lexchat_session::{Clipboard, ClipboardError};

/// Writes through the terminal with an OSC 52 escape, which most modern
/// emulators forward to the system clipboard even over SSH.
pub struct Osc52Clipboard;

fn write_osc52(out: &mut impl Write, text: &str) -> std::io::Result<()> {
    let encoded = STANDARD.encode(text.as_bytes());
    write!(out, "\x1b]52;c;{encoded}\x07")?;
    out.flush()
}

impl Clipboard for Osc52Clipboard {
    fn copy(&self, text: &str) -> Result<(), ClipboardError> {
        let mut stdout = std::io::stdout().lock();
        write_osc52(&mut stdout, text).map_err(|error| ClipboardError {
            message: error.to_string(),
        })
    }
}

//! Terminal clipboard via OSC 52.

use std::io::Write;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use color_eyre::Result;
use crossterm::execute;
use crossterm::style::Print;

/// Escape sequence asking the terminal to put `text` on the system clipboard.
pub fn osc52_sequence(text: &str) -> String {
    let encoded = STANDARD.encode(text.as_bytes());
    format!("\x1b]52;c;{}\x1b\\", encoded)
}

pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout();
    execute!(stdout, Print(osc52_sequence(text)))?;
    stdout.flush()?;
    log::debug!("Copied {} bytes to clipboard", text.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_osc52_sequence() {
        assert_eq!(osc52_sequence("a\tb"), "\x1b]52;c;YQli\x1b\\");
    }
}

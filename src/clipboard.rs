//! Clipboard sink for the `copy` session.
//!
//! The wallet core never touches the clipboard; the CLI hands it secrets and
//! must call [`Clipboard::clear`] when the session ends, including on expiry.

use anyhow::{Result, anyhow};

#[cfg(target_os = "linux")]
use std::process::{Command, Stdio};

#[cfg(not(target_os = "linux"))]
use copypasta::{ClipboardContext, ClipboardProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clipboard {
    /// Wayland, `wl-copy`.
    #[cfg(target_os = "linux")]
    WlCopy,
    /// X11, `xclip -selection clipboard`.
    #[cfg(target_os = "linux")]
    Xclip,
    /// copypasta (Windows/macOS).
    #[cfg(not(target_os = "linux"))]
    Native,
}

impl Clipboard {
    /// Linux: wl-copy или xclip, по переменным окружения сессии.
    #[cfg(target_os = "linux")]
    pub fn detect() -> Result<Self> {
        if std::env::var_os("WAYLAND_DISPLAY").is_some() {
            Ok(Clipboard::WlCopy)
        } else if std::env::var_os("DISPLAY").is_some() {
            Ok(Clipboard::Xclip)
        } else {
            // скорее всего чистый tty
            Err(anyhow!(
                "No GUI clipboard detected (no DISPLAY or WAYLAND_DISPLAY). \
                 Use `pm otp` or `pm ls` from a tty instead."
            ))
        }
    }

    #[cfg(not(target_os = "linux"))]
    pub fn detect() -> Result<Self> {
        Ok(Clipboard::Native)
    }

    pub fn set(&self, value: &str) -> Result<()> {
        match self {
            #[cfg(target_os = "linux")]
            Clipboard::WlCopy => pipe_to("wl-copy", &[], value),
            #[cfg(target_os = "linux")]
            Clipboard::Xclip => pipe_to("xclip", &["-selection", "clipboard"], value),
            #[cfg(not(target_os = "linux"))]
            Clipboard::Native => {
                let mut ctx = ClipboardContext::new()
                    .map_err(|e| anyhow!("Failed to initialize clipboard: {e}"))?;
                ctx.set_contents(value.to_string())
                    .map_err(|e| anyhow!("Failed to copy to clipboard: {e}"))
            }
        }
    }

    /// Затереть то, что было скопировано.
    pub fn clear(&self) -> Result<()> {
        match self {
            #[cfg(target_os = "linux")]
            Clipboard::WlCopy => pipe_to("wl-copy", &["--clear"], ""),
            _ => self.set(""),
        }
    }
}

#[cfg(target_os = "linux")]
fn pipe_to(cmd: &str, args: &[&str], value: &str) -> Result<()> {
    use std::io::Write;

    let mut child = Command::new(cmd)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| anyhow!("failed to spawn {cmd}: {e}"))?;

    // stdin закрывается при drop, иначе утилита ждёт EOF
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(value.as_bytes())?;
    }

    let status = child.wait()?;
    if !status.success() {
        return Err(anyhow!("{cmd} exited with status {status}"));
    }
    Ok(())
}

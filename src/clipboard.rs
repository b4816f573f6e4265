use anyhow::{Result, anyhow};
use std::sync::{Mutex, PoisonError};

/// Destination for an exported transcript.
pub trait ClipboardSink {
    fn set_text(&self, text: &str) -> Result<()>;
}

/// System clipboard. On X11 and Wayland the copied text is served by this
/// process, so the handle is opened on first use and kept for as long as
/// the `SystemClipboard` lives.
#[derive(Default)]
pub struct SystemClipboard {
    clipboard: Mutex<Option<arboard::Clipboard>>,
    hold_until_replaced: bool,
}

impl SystemClipboard {
    /// For processes that exit right after copying: on Linux, `set_text`
    /// blocks until another application takes over the clipboard.
    pub fn holding_until_replaced() -> Self {
        Self {
            clipboard: Mutex::new(None),
            hold_until_replaced: true,
        }
    }

    pub fn holds_until_replaced(&self) -> bool {
        self.hold_until_replaced && cfg!(target_os = "linux")
    }

    #[cfg(target_os = "linux")]
    fn write(&self, clipboard: &mut arboard::Clipboard, text: &str) -> Result<(), arboard::Error> {
        use arboard::SetExtLinux;

        if self.hold_until_replaced {
            clipboard.set().wait().text(text)
        } else {
            clipboard.set_text(text)
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn write(&self, clipboard: &mut arboard::Clipboard, text: &str) -> Result<(), arboard::Error> {
        clipboard.set_text(text)
    }
}

impl ClipboardSink for SystemClipboard {
    fn set_text(&self, text: &str) -> Result<()> {
        let mut guard = self
            .clipboard
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if guard.is_none() {
            let clipboard =
                arboard::Clipboard::new().map_err(|e| anyhow!("Clipboard unavailable: {}", e))?;
            *guard = Some(clipboard);
        }
        let clipboard = guard
            .as_mut()
            .ok_or_else(|| anyhow!("Clipboard unavailable"))?;

        self.write(clipboard, text)
            .map_err(|e| anyhow!("Failed to copy: {}", e))
    }
}

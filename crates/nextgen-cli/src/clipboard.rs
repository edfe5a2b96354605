use nextgen_core::{ChatError, Clipboard};

/// System clipboard, opened on first use.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clipboard for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ChatError> {
        if self.inner.is_none() {
            let opened =
                arboard::Clipboard::new().map_err(|e| ChatError::Clipboard(e.to_string()))?;
            self.inner = Some(opened);
        }
        match self.inner.as_mut() {
            Some(clipboard) => clipboard
                .set_text(text.to_string())
                .map_err(|e| ChatError::Clipboard(e.to_string())),
            None => Err(ChatError::Clipboard("clipboard unavailable".to_string())),
        }
    }
}

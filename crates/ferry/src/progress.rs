use std::io::{self, Write};

/// Sink for download progress.
///
/// The engine only reports byte counts; rendering (or ignoring them) is
/// entirely the implementation's business. Callbacks fire on the downloading
/// thread, so they should be quick.
pub trait Progress: Send + Sync {
    /// A download of `resource` is starting; `total_bytes` when the backend
    /// could cheaply report it.
    fn started(&self, resource: &str, total_bytes: Option<u64>);

    /// `bytes` more bytes were written to the staging file.
    fn advanced(&self, bytes: u64);

    /// The download finished after `total_written` bytes.
    fn finished(&self, resource: &str, total_written: u64);
}

/// A writer that counts bytes and forwards increments to a [`Progress`] sink.
pub(crate) struct CountingWriter<'a, W> {
    inner: W,
    written: u64,
    progress: Option<&'a dyn Progress>,
}

impl<'a, W: Write> CountingWriter<'a, W> {
    pub(crate) fn new(inner: W, progress: Option<&'a dyn Progress>) -> Self {
        Self {
            inner,
            written: 0,
            progress,
        }
    }

    pub(crate) fn total_written(&self) -> u64 {
        self.written
    }
}

impl<W: Write> Write for CountingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.written += written as u64;
        if let Some(progress) = self.progress {
            progress.advanced(written as u64);
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Log sink for env_logger.
///
/// The terminal runs in raw mode on the alternate screen, so records go to a
/// file instead of stderr. The file name comes from the config, and loading
/// the config already logs, so records are held in memory until `open()`
/// names the file.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Records kept while no file is open. Anything beyond is dropped.
const PENDING_LIMIT: usize = 64 * 1024;

enum Sink {
    Pending(Vec<u8>),
    File(File),
    Discard,
}

#[derive(Clone)]
pub struct LogSink(Arc<Mutex<Sink>>);

impl LogSink {
    pub fn new() -> Self {
        LogSink(Arc::new(Mutex::new(Sink::Pending(Vec::new()))))
    }

    /// Append to `path`, flushing anything logged so far.
    pub fn open(&self, path: &Path) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut sink = self.lock()?;
        if let Sink::Pending(buf) = &*sink {
            file.write_all(buf)?;
        }
        *sink = Sink::File(file);
        Ok(())
    }

    /// Drop pending records and ignore future ones.
    pub fn discard(&self) {
        if let Ok(mut sink) = self.lock() {
            *sink = Sink::Discard;
        }
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, Sink>> {
        self.0.lock().map_err(|_| io::Error::other("log sink poisoned"))
    }
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut sink = self.lock()?;
        match &mut *sink {
            Sink::Pending(pending) => {
                let room = PENDING_LIMIT.saturating_sub(pending.len());
                pending.extend_from_slice(&buf[..buf.len().min(room)]);
                Ok(buf.len())
            }
            Sink::File(file) => file.write(buf),
            Sink::Discard => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut *self.lock()? {
            Sink::File(file) => file.flush(),
            _ => Ok(()),
        }
    }
}

/// Install env_logger (filter from `RUST_LOG`, default `info`) writing into
/// a fresh sink. The returned handle opens the log file later.
pub fn init() -> LogSink {
    let sink = LogSink::new();
    let installed = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(sink.clone())))
        .format_timestamp_millis()
        .try_init();
    if let Err(e) = installed {
        eprintln!("logger already installed: {e}");
    }
    sink
}

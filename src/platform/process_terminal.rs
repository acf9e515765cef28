//! Process-based terminal implementation.

use std::io;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use libc::{self, c_int};
use signal_hook::iterator::Signals;

use crate::core::keys::{Key, KeyDecoder};
use crate::core::terminal::Terminal;
use crate::platform::tty::{poll_readable, read_fd, read_winsize, write_all_fd, RawModeGuard};

/// How long a lone ESC waits for the rest of a sequence before it counts as the Escape key.
const ESCAPE_TIMEOUT: Duration = Duration::from_millis(10);
const IDLE_POLL: Duration = Duration::from_millis(50);

type InputHandler = Arc<Mutex<Option<Box<dyn FnMut(Key) + Send>>>>;
type ResizeHandler = Arc<Mutex<Option<Box<dyn FnMut() + Send>>>>;

pub struct ProcessTerminal {
    stdin_fd: c_int,
    stdout_fd: c_int,
    raw_mode: Option<RawModeGuard>,
    input_handler: InputHandler,
    resize_handler: ResizeHandler,
    input_thread: Option<JoinHandle<()>>,
    stop_flag: Arc<AtomicBool>,
    resize_signal_handle: Option<signal_hook::iterator::Handle>,
    resize_thread: Option<JoinHandle<()>>,
}

impl ProcessTerminal {
    pub fn new() -> Self {
        Self {
            stdin_fd: libc::STDIN_FILENO,
            stdout_fd: libc::STDOUT_FILENO,
            raw_mode: None,
            input_handler: Arc::new(Mutex::new(None)),
            resize_handler: Arc::new(Mutex::new(None)),
            input_thread: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
            resize_signal_handle: None,
            resize_thread: None,
        }
    }

    fn start_input_thread(&mut self) -> io::Result<()> {
        let stdin_fd = self.stdin_fd;
        let input_handler = Arc::clone(&self.input_handler);
        let stop_flag = Arc::clone(&self.stop_flag);

        let handle = thread::Builder::new()
            .name("prompt-input".to_string())
            .spawn(move || {
                let mut buffer = [0u8; 4096];
                let mut decoder = KeyDecoder::new();

                while !stop_flag.load(Ordering::SeqCst) {
                    let timeout = if decoder.has_pending() {
                        ESCAPE_TIMEOUT
                    } else {
                        IDLE_POLL
                    };
                    let keys = match poll_readable(stdin_fd, timeout) {
                        Ok(true) => match read_fd(stdin_fd, &mut buffer) {
                            Ok(0) => {
                                tracing::debug!("stdin closed");
                                deliver_input_closed(&input_handler);
                                break;
                            }
                            Ok(len) => decoder.feed(&buffer[..len]),
                            Err(err) => {
                                tracing::warn!(error = %err, "stdin read failed");
                                deliver_input_closed(&input_handler);
                                break;
                            }
                        },
                        Ok(false) => decoder.flush_pending(),
                        Err(err) => {
                            tracing::warn!(error = %err, "stdin poll failed");
                            break;
                        }
                    };

                    if keys.is_empty() {
                        continue;
                    }
                    let mut handler = lock_unpoisoned(&input_handler);
                    if let Some(handler) = handler.as_mut() {
                        for key in keys {
                            handler(key);
                        }
                    }
                }
            })?;

        self.input_thread = Some(handle);
        Ok(())
    }

    fn stop_input_thread(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.input_thread.take() {
            let _ = handle.join();
        }
    }

    fn start_resize_thread(&mut self) -> io::Result<()> {
        let mut signals = Signals::new([libc::SIGWINCH])?;
        let handle = signals.handle();
        let resize_handler = Arc::clone(&self.resize_handler);

        let thread = thread::Builder::new()
            .name("prompt-resize".to_string())
            .spawn(move || {
                for _ in signals.forever() {
                    let mut handler = lock_unpoisoned(&resize_handler);
                    if let Some(handler) = handler.as_mut() {
                        handler();
                    }
                }
            })?;

        self.resize_signal_handle = Some(handle);
        self.resize_thread = Some(thread);
        Ok(())
    }

    fn stop_resize_thread(&mut self) {
        if let Some(handle) = self.resize_signal_handle.take() {
            handle.close();
        }
        if let Some(thread) = self.resize_thread.take() {
            let _ = thread.join();
        }
    }

    fn clear_handlers(&self) {
        *lock_unpoisoned(&self.input_handler) = None;
        *lock_unpoisoned(&self.resize_handler) = None;
    }
}

impl Default for ProcessTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal for ProcessTerminal {
    fn start(
        &mut self,
        on_input: Box<dyn FnMut(Key) + Send>,
        on_resize: Box<dyn FnMut() + Send>,
    ) -> io::Result<()> {
        *lock_unpoisoned(&self.input_handler) = Some(on_input);
        *lock_unpoisoned(&self.resize_handler) = Some(on_resize);
        self.stop_flag.store(false, Ordering::SeqCst);

        if self.raw_mode.is_none() {
            match RawModeGuard::enter(self.stdin_fd) {
                Ok(guard) => self.raw_mode = Some(guard),
                Err(err) => {
                    self.clear_handlers();
                    return Err(err);
                }
            }
        }

        if let Err(err) = self
            .start_resize_thread()
            .and_then(|()| self.start_input_thread())
        {
            let _ = self.stop();
            return Err(err);
        }
        Ok(())
    }

    fn stop(&mut self) -> io::Result<()> {
        self.stop_input_thread();
        self.stop_resize_thread();
        self.clear_handlers();

        // Dropping the guard flushes pending input, then restores the original mode.
        match self.raw_mode.take() {
            Some(guard) => {
                let restored = guard.restore();
                drop(guard);
                restored
            }
            None => Ok(()),
        }
    }

    fn write(&mut self, data: &str) -> io::Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        write_all_fd(self.stdout_fd, data.as_bytes())
    }

    fn columns(&self) -> u16 {
        read_winsize(self.stdout_fd)
            .map(|(cols, _)| cols)
            .unwrap_or(80)
    }
}

impl Drop for ProcessTerminal {
    fn drop(&mut self) {
        if self.raw_mode.is_some() || self.input_thread.is_some() {
            let _ = self.stop();
        }
    }
}

/// No further keys can arrive; an interrupt lets the session end instead of waiting forever.
fn deliver_input_closed(input_handler: &InputHandler) {
    if let Some(handler) = lock_unpoisoned(input_handler).as_mut() {
        handler(Key::Ctrl('c'));
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

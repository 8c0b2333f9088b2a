//! Remote control via Unix socket
//!
//! One command per line: `next`, `prev`, `fullscreen`, `quit`. Commands are
//! handed to the frame loop over a channel, the same way key presses are.

use anyhow::Context;
use log::{debug, info, warn};
use std::io::{BufRead, BufReader};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Manual controls shared by keyboard and socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    ToggleFullscreen,
    Quit,
}

impl Command {
    /// Parse one line of socket input, case-insensitively
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "next" | "right" => Some(Self::Next),
            "prev" | "previous" | "left" => Some(Self::Previous),
            "fullscreen" | "f" => Some(Self::ToggleFullscreen),
            "quit" | "exit" | "q" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Listens for commands on a Unix socket
pub struct Controller {
    receiver: Receiver<Command>,
    path: PathBuf,
    stop: Arc<AtomicBool>,
    _listener_thread: thread::JoinHandle<()>,
}

impl Controller {
    /// Bind `path`, replacing any stale socket file
    pub fn bind(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let _ = std::fs::remove_file(&path);

        let listener = UnixListener::bind(&path)
            .with_context(|| format!("binding control socket {}", path.display()))?;
        // Non-blocking so the thread notices the stop flag
        listener
            .set_nonblocking(true)
            .context("setting control socket non-blocking")?;

        let (sender, receiver) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::spawn(move || Self::listener_loop(&listener, &sender, &flag));

        info!("Control socket listening on {}", path.display());
        Ok(Self {
            receiver,
            path,
            stop,
            _listener_thread: handle,
        })
    }

    fn listener_loop(listener: &UnixListener, sender: &Sender<Command>, stop: &AtomicBool) {
        while !stop.load(Ordering::Relaxed) {
            match listener.accept() {
                Ok((stream, _)) => {
                    let sender = sender.clone();
                    thread::spawn(move || Self::handle_client(stream, &sender));
                },
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(50));
                },
                Err(e) => {
                    warn!("Control socket closed: {}", e);
                    break;
                },
            }
        }
    }

    fn handle_client(stream: UnixStream, sender: &Sender<Command>) {
        // Accepted streams can inherit non-blocking mode on some platforms
        if let Err(e) = stream.set_nonblocking(false) {
            warn!("Control client unusable: {}", e);
            return;
        }
        for line in BufReader::new(stream).lines().map_while(Result::ok) {
            match Command::parse(&line) {
                Some(cmd) => {
                    debug!("Control command {:?}", cmd);
                    if sender.send(cmd).is_err() {
                        break;
                    }
                },
                None => warn!("Unknown control command '{}'", line.trim()),
            }
        }
    }

    /// Pending commands, oldest first (non-blocking)
    pub fn poll(&self) -> Vec<Command> {
        self.receiver.try_iter().collect()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = std::fs::remove_file(&self.path);
    }
}

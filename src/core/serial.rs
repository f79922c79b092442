//! Serial link to the glove
//!
//! A background thread owns the read half: it assembles `\n` frames, classifies
//! them and sends `GloveLine`s over a channel. The main thread drains the
//! channel once per frame and writes feedback through a mutex-guarded clone of
//! the port.

use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, error, info, warn};

use crate::config::{AccelFormat, GloveConfig};
use crate::core::feedback::FeedbackWriter;
use crate::core::line_parser::LineParser;
use crate::error::GloveError;
use crate::types::GloveLine;
use crate::{OPEN_SETTLE_MS, READER_JOIN_TIMEOUT_MS, READ_ERROR_BACKOFF_MS, READ_TIMEOUT_MS, WRITE_TIMEOUT_MS};

/// Unterminated input longer than this is discarded
const MAX_PENDING_BYTES: usize = 4096;

/// Port handle shared between the link and the feedback writer
pub type SharedPort = Arc<Mutex<Box<dyn SerialPort>>>;

/// How to open the port and what the reader does with lines
#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub port: String,
    pub baud: u32,
    pub accel_format: AccelFormat,
    /// Number of recognised raw lines logged at debug; 0 disables
    pub raw_log_max: usize,
}

impl SerialSettings {
    pub fn from_config(config: &GloveConfig) -> Self {
        Self {
            port: config.port.clone(),
            baud: config.baud,
            accel_format: config.accel_format,
            raw_log_max: if config.log_raw_lines { config.raw_log_max } else { 0 },
        }
    }
}

/// Names of the serial ports on this machine
pub fn list_ports() -> Result<Vec<String>, GloveError> {
    let ports = serialport::available_ports()?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

/// Preferred port if present, otherwise the highest-numbered one
pub fn pick_port(preferred: &str, available: &[String]) -> Option<String> {
    if let Some(p) = available.iter().find(|p| p.eq_ignore_ascii_case(preferred)) {
        return Some(p.clone());
    }
    available.iter().max_by_key(|p| trailing_number(p)).cloned()
}

/// Trailing digits of a port name, -1 if there are none
fn trailing_number(name: &str) -> i64 {
    let digits: String = name
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().unwrap_or(-1)
}

/// `COM10` and above need the device namespace prefix on Windows
pub fn windows_port_name(name: &str) -> String {
    let upper = name.to_ascii_uppercase();
    match upper.strip_prefix("COM").and_then(|n| n.parse::<u32>().ok()) {
        Some(n) if n >= 10 => format!(r"\\.\COM{}", n),
        _ => name.to_string(),
    }
}

pub fn platform_port_name(name: &str) -> String {
    if cfg!(windows) {
        windows_port_name(name)
    } else {
        name.to_string()
    }
}

/// Splits a byte stream into trimmed, non-blank lines
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &b in bytes {
            if b == b'\n' {
                let line = String::from_utf8_lossy(&self.pending).trim().to_string();
                self.pending.clear();
                if !line.is_empty() {
                    lines.push(line);
                }
            } else {
                self.pending.push(b);
                if self.pending.len() > MAX_PENDING_BYTES {
                    self.pending.clear();
                }
            }
        }
        lines
    }
}

/// Feedback through the shared port
pub struct SerialFeedbackWriter {
    port: SharedPort,
}

impl SerialFeedbackWriter {
    pub fn new(port: SharedPort) -> Self {
        Self { port }
    }
}

impl FeedbackWriter for SerialFeedbackWriter {
    fn write_line(&mut self, line: &str) -> Result<(), GloveError> {
        let mut port = self
            .port
            .lock()
            .map_err(|_| GloveError::FeedbackWrite("port lock poisoned".to_string()))?;
        port.write_all(format!("{}\n", line).as_bytes())
            .and_then(|_| port.flush())
            .map_err(|e| GloveError::FeedbackWrite(e.to_string()))
    }
}

/// Open glove connection with its reader thread
pub struct SerialLink {
    port_name: String,
    lines: Receiver<GloveLine>,
    writer: SharedPort,
    running: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl SerialLink {
    /// Pick a port from the machine's list and open it
    pub fn connect(settings: &SerialSettings) -> Result<SerialLink, GloveError> {
        let ports = list_ports()?;
        let port = pick_port(&settings.port, &ports).ok_or(GloveError::NoPortsFound)?;
        if !port.eq_ignore_ascii_case(&settings.port) {
            info!("[SERIAL] {} not present, using {}", settings.port, port);
        }
        Self::open(&SerialSettings {
            port,
            ..settings.clone()
        })
    }

    /// Open `settings.port` (8N1, no flow control) and start reading
    pub fn open(settings: &SerialSettings) -> Result<SerialLink, GloveError> {
        let name = platform_port_name(&settings.port);
        let mut port = serialport::new(&name, settings.baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(READ_TIMEOUT_MS))
            .open()
            .map_err(|e| {
                error!("[SERIAL] open {} failed: {}", name, e);
                GloveError::from(e)
            })?;

        port.write_data_terminal_ready(true)?;
        port.write_request_to_send(true)?;
        // The glove resets on DTR
        thread::sleep(Duration::from_millis(OPEN_SETTLE_MS));

        let mut writer = port.try_clone()?;
        writer.set_timeout(Duration::from_millis(WRITE_TIMEOUT_MS))?;

        let (tx, rx) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));
        let parser = LineParser::with_accel_format(settings.accel_format);
        let raw_log_max = settings.raw_log_max;
        let flag = Arc::clone(&running);
        let reader = thread::Builder::new()
            .name("glove-serial".to_string())
            .spawn(move || read_loop(port, parser, tx, flag, raw_log_max))?;

        info!("[SERIAL] connected {} @ {}", settings.port, settings.baud);
        Ok(SerialLink {
            port_name: settings.port.clone(),
            lines: rx,
            writer: Arc::new(Mutex::new(writer)),
            running,
            reader: Some(reader),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Every line queued so far, oldest first; never blocks
    pub fn drain(&self) -> Vec<GloveLine> {
        self.lines.try_iter().collect()
    }

    pub fn feedback_writer(&self) -> SerialFeedbackWriter {
        SerialFeedbackWriter::new(Arc::clone(&self.writer))
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed) && self.reader.as_ref().map_or(false, |h| !h.is_finished())
    }

    /// Stop the reader; waits at most the join timeout
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        let Some(handle) = self.reader.take() else {
            return;
        };
        let deadline = Instant::now() + Duration::from_millis(READER_JOIN_TIMEOUT_MS);
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        if handle.is_finished() {
            let _ = handle.join();
            debug!("[SERIAL] reader stopped");
        } else {
            warn!("[SERIAL] reader did not stop in time, detaching");
        }
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("port", &self.port_name)
            .field("running", &self.running.load(Ordering::Relaxed))
            .finish()
    }
}

fn read_loop<R: Read>(
    mut port: R,
    parser: LineParser,
    tx: Sender<GloveLine>,
    running: Arc<AtomicBool>,
    raw_log_max: usize,
) {
    let mut assembler = LineAssembler::new();
    let mut buf = [0u8; 256];
    let mut logged = 0usize;

    while running.load(Ordering::Relaxed) {
        let n = match port.read(&mut buf) {
            Ok(0) => {
                thread::sleep(Duration::from_millis(READ_ERROR_BACKOFF_MS));
                continue;
            }
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => continue,
            Err(e) => {
                debug!("[SERIAL] read error: {}", e);
                thread::sleep(Duration::from_millis(READ_ERROR_BACKOFF_MS));
                continue;
            }
        };

        for raw in assembler.push(&buf[..n]) {
            let Some(line) = parser.parse(&raw) else {
                continue;
            };
            if logged < raw_log_max {
                logged += 1;
                debug!("[RAW] {}", raw);
            }
            if tx.send(line).is_err() {
                return;
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pick_preferred_port() {
        let ports = names(&["COM1", "COM3", "COM7"]);
        assert_eq!(pick_port("com3", &ports), Some("COM3".to_string()));
    }

    #[test]
    fn test_pick_highest_numbered_port() {
        let ports = names(&["COM4", "COM12", "COM9", "/dev/ttyUSB"]);
        assert_eq!(pick_port("COM3", &ports), Some("COM12".to_string()));
        assert_eq!(pick_port("COM3", &[]), None);
    }

    #[test]
    fn test_windows_port_names() {
        assert_eq!(windows_port_name("COM3"), "COM3");
        assert_eq!(windows_port_name("COM10"), r"\\.\COM10");
        assert_eq!(windows_port_name("/dev/ttyACM0"), "/dev/ttyACM0");
    }

    #[test]
    fn test_assembler_splits_and_trims() {
        let mut a = LineAssembler::new();
        assert!(a.push(b"flex 1 0").is_empty());
        let lines = a.push(b" 1 1 1\r\n\r\nthumb\npin");
        assert_eq!(lines, vec!["flex 1 0 1 1 1", "thumb"]);
        assert_eq!(a.push(b"kie\n"), vec!["pinkie"]);
    }

    #[test]
    fn test_reader_loop_forwards_parsed_lines() {
        struct Script(Vec<Vec<u8>>, Arc<AtomicBool>);

        impl Read for Script {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if self.0.is_empty() {
                    self.1.store(false, Ordering::Relaxed);
                    return Err(std::io::Error::new(ErrorKind::TimedOut, "timeout"));
                }
                let chunk = self.0.remove(0);
                buf[..chunk.len()].copy_from_slice(&chunk);
                Ok(chunk.len())
            }
        }

        let running = Arc::new(AtomicBool::new(true));
        let script = Script(
            vec![b"hello\nsha".to_vec(), b"ke\nindex\n".to_vec()],
            Arc::clone(&running),
        );
        let (tx, rx) = mpsc::channel();
        read_loop(script, LineParser::new(), tx, running, 0);
        let got: Vec<GloveLine> = rx.try_iter().collect();
        assert_eq!(
            got,
            vec![GloveLine::Shake, GloveLine::Finger(crate::types::Finger::Index)]
        );
    }
}

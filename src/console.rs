use cogex_core::{SlotIndex, StimulusId};
use cogex_experiment::{DisplayDriver, DriverError, Frame, InputDriver, Response, SlotMapping};
use cogex_timing::{nanos_to_secs, secs_to_nanos, HighPrecisionTimer, Timer};
use std::io::{self, Write};
use std::time::Duration;

const CLEAR: &str = "\x1b[2J\x1b[H";

fn glyph(stim: StimulusId) -> &'static str {
    match stim {
        StimulusId::Circle => "  ***  \n *   * \n  ***  ",
        StimulusId::Rectangle => "+-----+\n|     |\n+-----+",
        StimulusId::Star => " \\ | / \n--***--\n / | \\ ",
        StimulusId::Triangle => "   ^   \n  / \\  \n /___\\ ",
    }
}

/// Text shown for one frame.
pub fn render(frame: &Frame) -> String {
    match frame {
        Frame::Fixation => "\n\n        +\n".to_string(),
        Frame::Rest => "\n\n        +\n\n   (rest)\n".to_string(),
        Frame::Stimulus(stim) => format!("\n{}\n", glyph(*stim)),
        Frame::ResponseScreen(mapping) => render_mapping(mapping),
    }
}

fn render_mapping(mapping: &SlotMapping) -> String {
    let mut out = String::from("\n");
    for slot in SlotIndex::all() {
        out.push_str(&format!("  [{}] {}", slot.get(), mapping.stim_at(slot)));
    }
    out.push('\n');
    out
}

/// Terminal display. Sleeps on the high-precision timer until each onset,
/// then draws the frame.
pub struct ConsoleDisplay {
    timer: HighPrecisionTimer,
    out: io::Stdout,
}

impl ConsoleDisplay {
    pub fn new(timer: HighPrecisionTimer) -> Self {
        Self {
            timer,
            out: io::stdout(),
        }
    }

    fn draw(&mut self, text: &str) -> io::Result<()> {
        let mut out = self.out.lock();
        write!(out, "{CLEAR}{text}")?;
        out.flush()
    }
}

impl DisplayDriver for ConsoleDisplay {
    fn present(&mut self, frame: Frame, _duration: f64, onset: f64) -> Result<f64, DriverError> {
        let text = render(&frame);
        self.timer.sleep_until(secs_to_nanos(onset));
        self.draw(&text)
            .map_err(|e| DriverError::Presentation(e.to_string()))?;
        Ok(nanos_to_secs(self.timer.now()))
    }

    fn instructions(&mut self, text: &str) -> Result<(), DriverError> {
        self.draw(&format!("{text}\n\nPress any key to continue, q to quit.\n"))
            .map_err(|e| DriverError::Presentation(e.to_string()))?;
        discard_pending();
        match read_key(None).map_err(|e| DriverError::Input(e.to_string()))? {
            Some(b'q') => Err(DriverError::Aborted),
            _ => Ok(()),
        }
    }
}

/// Keys `1`-`4` select a slot, `q` aborts the session.
pub struct TerminalInput {
    timer: HighPrecisionTimer,
}

impl TerminalInput {
    pub fn new(timer: HighPrecisionTimer) -> Self {
        Self { timer }
    }
}

/// Maps a key byte to its meaning on the response screen.
fn decode_key(key: u8) -> Option<Result<SlotIndex, DriverError>> {
    match key {
        b'q' | b'Q' => Some(Err(DriverError::Aborted)),
        b'1'..=b'4' => SlotIndex::new(key - b'0').map(Ok),
        _ => None,
    }
}

impl InputDriver for TerminalInput {
    fn await_response(&mut self, deadline: f64) -> Result<Response, DriverError> {
        discard_pending();
        loop {
            let remaining = deadline - nanos_to_secs(self.timer.now());
            if remaining <= 0.0 {
                return Ok(Response::none());
            }
            let key = read_key(Some(Duration::from_secs_f64(remaining)))
                .map_err(|e| DriverError::Input(e.to_string()))?;
            let pressed_at = nanos_to_secs(self.timer.now());
            if let Some(decoded) = key.and_then(decode_key) {
                return decoded.map(|slot| Response::pressed(slot, pressed_at));
            }
        }
    }
}

/// Puts the terminal in non-canonical, no-echo mode until dropped so single
/// key presses are delivered immediately.
#[cfg(unix)]
pub struct RawMode {
    original: libc::termios,
}

#[cfg(unix)]
impl RawMode {
    /// `None` when stdin is not a terminal.
    pub fn enable() -> io::Result<Option<Self>> {
        // SAFETY: termios calls on the process's own stdin with a valid struct.
        unsafe {
            if libc::isatty(libc::STDIN_FILENO) != 1 {
                return Ok(None);
            }
            let mut original = std::mem::MaybeUninit::<libc::termios>::uninit();
            if libc::tcgetattr(libc::STDIN_FILENO, original.as_mut_ptr()) != 0 {
                return Err(io::Error::last_os_error());
            }
            let original = original.assume_init();
            let mut raw = original;
            raw.c_lflag &= !(libc::ICANON | libc::ECHO);
            raw.c_cc[libc::VMIN] = 1;
            raw.c_cc[libc::VTIME] = 0;
            if libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &raw) != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(Some(Self { original }))
        }
    }
}

#[cfg(unix)]
impl Drop for RawMode {
    fn drop(&mut self) {
        // SAFETY: restores the attributes read in `enable`.
        unsafe {
            libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &self.original);
        }
    }
}

#[cfg(not(unix))]
pub struct RawMode;

#[cfg(not(unix))]
impl RawMode {
    pub fn enable() -> io::Result<Option<Self>> {
        Ok(None)
    }
}

/// Drops keys typed before the current screen.
#[cfg(unix)]
fn discard_pending() {
    // SAFETY: flushes the input queue of our own stdin.
    unsafe {
        libc::tcflush(libc::STDIN_FILENO, libc::TCIFLUSH);
    }
}

#[cfg(not(unix))]
fn discard_pending() {}

/// Reads one byte from stdin, waiting at most `timeout` (forever if `None`).
#[cfg(unix)]
fn read_key(timeout: Option<Duration>) -> io::Result<Option<u8>> {
    let timeout_ms = match timeout {
        Some(d) => d.as_micros().div_ceil(1000).min(i32::MAX as u128) as i32,
        None => -1,
    };
    let mut fds = libc::pollfd {
        fd: libc::STDIN_FILENO,
        events: libc::POLLIN,
        revents: 0,
    };
    // SAFETY: one valid pollfd.
    let ready = unsafe { libc::poll(&mut fds, 1, timeout_ms) };
    if ready < 0 {
        let err = io::Error::last_os_error();
        return if err.kind() == io::ErrorKind::Interrupted {
            Ok(None)
        } else {
            Err(err)
        };
    }
    if ready == 0 {
        return Ok(None);
    }
    let mut byte = 0u8;
    // SAFETY: reads at most one byte into a live u8.
    let n = unsafe { libc::read(libc::STDIN_FILENO, (&mut byte as *mut u8).cast(), 1) };
    match n {
        1 => Ok(Some(byte)),
        0 => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed")),
        _ => Err(io::Error::last_os_error()),
    }
}

#[cfg(not(unix))]
fn read_key(timeout: Option<Duration>) -> io::Result<Option<u8>> {
    match timeout {
        Some(d) => {
            std::thread::sleep(d);
            Ok(None)
        }
        None => {
            let mut line = String::new();
            io::stdin().read_line(&mut line)?;
            Ok(Some(line.bytes().next().unwrap_or(b'\n')))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogex_experiment::generate_mapping;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn digit_keys_select_slots() {
        assert_eq!(decode_key(b'1'), Some(Ok(SlotIndex::new(1).unwrap())));
        assert_eq!(decode_key(b'4'), Some(Ok(SlotIndex::new(4).unwrap())));
        assert_eq!(decode_key(b'q'), Some(Err(DriverError::Aborted)));
        assert_eq!(decode_key(b'5'), None);
        assert_eq!(decode_key(b'0'), None);
        assert_eq!(decode_key(b' '), None);
    }

    #[test]
    fn response_screen_lists_slots_in_order() {
        let mapping = generate_mapping(&StimulusId::ALL, &mut StdRng::seed_from_u64(1)).unwrap();
        let text = render(&Frame::ResponseScreen(mapping));
        let mut last = 0;
        for slot in SlotIndex::all() {
            let label = format!("[{}] {}", slot.get(), mapping.stim_at(slot));
            let at = text.find(&label).unwrap();
            assert!(at >= last);
            last = at;
        }
    }

    #[test]
    fn every_stimulus_has_a_distinct_glyph() {
        let glyphs: std::collections::HashSet<_> =
            StimulusId::ALL.iter().map(|s| glyph(*s)).collect();
        assert_eq!(glyphs.len(), StimulusId::ALL.len());
    }
}

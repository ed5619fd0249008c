//! Terminal service: the raw-mode single-key reader.
//!
//! `key_pressed` needs one byte without waiting for Enter. On unix the TTY
//! is switched to non-canonical, no-echo mode for the duration of the read;
//! the saved termios state is restored by an RAII guard on every exit path,
//! including panics and errors. Elsewhere the reader falls back to a plain
//! buffered one-byte read.

use std::io;

pub trait KeySource {
    fn read_key(&mut self) -> io::Result<char>;
}

/// Reads from the process's controlling terminal.
pub struct TerminalKeys;

impl KeySource for TerminalKeys {
    fn read_key(&mut self) -> io::Result<char> {
        read_single_key()
    }
}

#[cfg(unix)]
pub fn read_single_key() -> io::Result<char> {
    let _guard = raw::RawModeGuard::new(libc::STDIN_FILENO)?;
    let mut buf = [0u8; 1];
    let n = unsafe { libc::read(libc::STDIN_FILENO, buf.as_mut_ptr() as *mut libc::c_void, 1) };
    if n < 0 {
        return Err(io::Error::last_os_error());
    }
    if n == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "end of input while waiting for a key",
        ));
    }
    Ok(buf[0] as char)
}

#[cfg(not(unix))]
pub fn read_single_key() -> io::Result<char> {
    use std::io::Read;
    let mut buf = [0u8; 1];
    io::stdin().read_exact(&mut buf)?;
    Ok(buf[0] as char)
}

#[cfg(unix)]
mod raw {
    use std::io;

    /// Disables ICANON and ECHO on construction, restores the saved termios
    /// state on drop.
    pub struct RawModeGuard {
        fd: libc::c_int,
        saved: libc::termios,
    }

    impl RawModeGuard {
        pub fn new(fd: libc::c_int) -> io::Result<Self> {
            let mut saved: libc::termios = unsafe { std::mem::zeroed() };
            if unsafe { libc::tcgetattr(fd, &mut saved) } != 0 {
                return Err(io::Error::last_os_error());
            }
            let mut rawer = saved;
            rawer.c_lflag &= !(libc::ICANON | libc::ECHO);
            if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &rawer) } != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(RawModeGuard { fd, saved })
        }
    }

    impl Drop for RawModeGuard {
        fn drop(&mut self) {
            // Restoration is best-effort; there is nowhere to report failure
            unsafe {
                libc::tcsetattr(self.fd, libc::TCSANOW, &self.saved);
            }
        }
    }
}

//! Terminal mode snapshot
//!
//! The line editor and the command menu switch the terminal to raw mode while
//! they wait for input on the blocking pool. When a signal ends the process
//! during such a wait their guards never run, so the mode seen at startup is
//! captured here and written back before exiting.

/// Terminal attributes of standard input as they were at capture time
pub struct TerminalMode {
    #[cfg(unix)]
    saved: Option<libc::termios>,
}

impl TerminalMode {
    /// Snapshot the current attributes; nothing is captured when stdin is not a terminal
    #[cfg(unix)]
    pub fn capture() -> Self {
        let fd = libc::STDIN_FILENO;
        if unsafe { libc::isatty(fd) } != 1 {
            return Self { saved: None };
        }

        let mut attrs = std::mem::MaybeUninit::<libc::termios>::uninit();
        let saved = if unsafe { libc::tcgetattr(fd, attrs.as_mut_ptr()) } == 0 {
            Some(unsafe { attrs.assume_init() })
        } else {
            None
        };
        Self { saved }
    }

    #[cfg(not(unix))]
    pub fn capture() -> Self {
        Self {}
    }

    /// Whether there is anything to restore
    pub fn is_captured(&self) -> bool {
        #[cfg(unix)]
        {
            self.saved.is_some()
        }
        #[cfg(not(unix))]
        {
            false
        }
    }

    /// Write the captured attributes back, returning whether it succeeded
    ///
    /// Safe to call any number of times.
    #[cfg(unix)]
    pub fn restore(&self) -> bool {
        match &self.saved {
            Some(attrs) => unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, attrs) == 0 },
            None => false,
        }
    }

    #[cfg(not(unix))]
    pub fn restore(&self) -> bool {
        false
    }
}

//! HID connection channel
//!
//! A connection consists of two L2CAP channel fds handed over by BlueZ:
//! control (PSM 0x11) and interrupt (PSM 0x13). Input reports go out on the
//! interrupt channel only; the control channel is held open for the
//! lifetime of the connection and released together with it.

use hidp::{HidError, Result};
use std::os::fd::OwnedFd;
use tracing::debug;

/// Owner of the two channel fds of one peer connection
///
/// Fds are `OwnedFd`s, so dropping or replacing them closes the underlying
/// sockets; `close()` on an already-closed channel is a no-op.
#[derive(Debug, Default)]
pub struct ConnectionChannel {
    control: Option<OwnedFd>,
    interrupt: Option<OwnedFd>,
}

impl ConnectionChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a freshly connected fd pair
    ///
    /// Any previous connection's fds are closed by the replacement.
    pub fn open(&mut self, control: OwnedFd, interrupt: OwnedFd) {
        debug!("connection channel open (control + interrupt)");
        self.control = Some(control);
        self.interrupt = Some(interrupt);
    }

    pub fn is_connected(&self) -> bool {
        self.interrupt.is_some()
    }

    /// Write raw report bytes to the interrupt channel
    ///
    /// A failed write leaves the channel state untouched; whether to
    /// disconnect is the caller's decision.
    pub fn write(&self, bytes: &[u8]) -> Result<()> {
        let fd = self.interrupt.as_ref().ok_or(HidError::NotConnected)?;
        let written =
            nix::unistd::write(fd, bytes).map_err(|e| HidError::WriteFailed(e.into()))?;
        if written != bytes.len() {
            return Err(HidError::WriteFailed(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                format!("short write: {} of {} bytes", written, bytes.len()),
            )));
        }
        Ok(())
    }

    /// Release both fds; safe to call at any time, any number of times
    pub fn close(&mut self) {
        if self.control.take().is_some() | self.interrupt.take().is_some() {
            debug!("connection channel closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn pipe_pair() -> (OwnedFd, std::fs::File) {
        let (read_end, write_end) = nix::unistd::pipe().unwrap();
        (write_end, std::fs::File::from(read_end))
    }

    #[test]
    fn test_write_reaches_interrupt_channel() {
        let (intr_w, mut intr_r) = pipe_pair();
        let (ctrl_w, _ctrl_r) = pipe_pair();

        let mut channel = ConnectionChannel::new();
        channel.open(ctrl_w, intr_w);
        assert!(channel.is_connected());

        channel.write(&[0xA1, 0x01, 0x00]).unwrap();
        let mut buf = [0u8; 3];
        intr_r.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [0xA1, 0x01, 0x00]);
    }

    #[test]
    fn test_write_without_connection_is_not_connected() {
        let channel = ConnectionChannel::new();
        assert!(!channel.is_connected());
        assert!(matches!(
            channel.write(&[0u8; 10]),
            Err(HidError::NotConnected)
        ));
    }

    #[test]
    fn test_write_after_peer_hangup_fails_without_state_change() {
        let (intr_w, intr_r) = pipe_pair();
        let (ctrl_w, _ctrl_r) = pipe_pair();

        let mut channel = ConnectionChannel::new();
        channel.open(ctrl_w, intr_w);
        drop(intr_r); // peer goes away

        assert!(matches!(
            channel.write(&[0u8; 10]),
            Err(HidError::WriteFailed(_))
        ));
        // Still "connected" as far as the channel knows; no auto-reconnect,
        // no auto-close.
        assert!(channel.is_connected());
    }

    #[test]
    fn test_close_is_idempotent() {
        let (intr_w, _intr_r) = pipe_pair();
        let (ctrl_w, _ctrl_r) = pipe_pair();

        let mut channel = ConnectionChannel::new();
        channel.close(); // never opened
        channel.open(ctrl_w, intr_w);
        channel.close();
        assert!(!channel.is_connected());
        channel.close(); // already closed
        assert!(!channel.is_connected());
    }
}

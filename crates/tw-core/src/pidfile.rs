//! PID marker utilities for single-session management
//!
//! The tunnel daemon writes its PID to a marker file (`--writepid`). The
//! marker is advisory: the process may have died without cleanup, so every
//! consumer must re-validate liveness instead of trusting file existence.

use std::fs;
use std::io;
use std::path::Path;

/// Read the PID from the marker file
///
/// `Ok(None)` when the marker is absent; a marker that does not parse as a
/// PID is an error.
pub fn read_pid_file(path: &Path) -> io::Result<Option<u32>> {
    match fs::read_to_string(path) {
        Ok(contents) => contents
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Write a PID to the marker file, creating parent directories as needed
pub fn write_pid_file(path: &Path, pid: u32) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, format!("{}\n", pid))
}

/// Remove the PID marker file; an already-absent marker is not an error
pub fn remove_pid_file(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Check whether a process with the given PID is alive
///
/// Signal 0 probes existence without delivering anything.
#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
    unsafe {
        if libc::kill(pid as libc::pid_t, 0) == 0 {
            return true;
        }
        // EPERM means the process exists but is not ours to signal
        io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
    }
}

/// Read the PID marker and confirm the recorded process is actually alive
///
/// Returns `Ok(Some(pid))` only for a live process. A marker naming a dead
/// process yields `Ok(None)` so callers treat it as stale.
pub fn read_running_pid(path: &Path) -> io::Result<Option<u32>> {
    match read_pid_file(path)? {
        Some(pid) if is_process_alive(pid) => Ok(Some(pid)),
        _ => Ok(None),
    }
}

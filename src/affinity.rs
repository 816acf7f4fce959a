//! CPU affinity for the current thread.
//!
//! Used by [`PoolBuilder::pin_workers`](crate::PoolBuilder::pin_workers) and
//! available to per-thread init hooks.

use std::io;

/// Restricts the current thread to run on CPU core `core`.
///
/// Supported on Linux and Windows. Other targets return an error of kind
/// [`io::ErrorKind::Unsupported`].
#[cfg(target_os = "linux")]
pub fn pin_current_thread(core: usize) -> io::Result<()> {
    if core >= libc::CPU_SETSIZE as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("core {core} is out of range"),
        ));
    }

    // Safety: `cpu_set_t` is a plain bit set for which all-zero is the empty
    // set, and `sched_setaffinity(0, ..)` only reads it.
    let rc = unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_SET(core, &mut set);
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set)
    };

    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Restricts the current thread to run on CPU core `core`.
///
/// Supported on Linux and Windows. Other targets return an error of kind
/// [`io::ErrorKind::Unsupported`].
#[cfg(windows)]
pub fn pin_current_thread(core: usize) -> io::Result<()> {
    use windows_sys::Win32::System::Threading::{GetCurrentThread, SetThreadAffinityMask};

    if core >= usize::BITS as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("core {core} is out of range"),
        ));
    }

    // Safety: the pseudo handle of the current thread is always valid.
    let previous = unsafe { SetThreadAffinityMask(GetCurrentThread(), 1usize << core) };

    if previous != 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Restricts the current thread to run on CPU core `core`.
///
/// Supported on Linux and Windows. Other targets return an error of kind
/// [`io::ErrorKind::Unsupported`].
#[cfg(not(any(target_os = "linux", windows)))]
pub fn pin_current_thread(core: usize) -> io::Result<()> {
    let _ = core;
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "thread affinity is not supported on this platform",
    ))
}

//! # Platform thread layer: priorities, scheduling policies, naming.
//!
//! Portable [`ThreadPriority`] / [`SchedPolicy`] selectors plus the small set
//! of OS calls the workers need: applying a priority to the current thread
//! and naming it. Spawning itself goes through `std::thread::Builder`; the
//! priority is applied by the new thread as its first action.

use std::io;

/// Thread names are at most 15 bytes on platforms that limit them.
pub const MAX_THREAD_NAME_LEN: usize = 15;

/// Portable thread priority classes.
///
/// Native mapping depends on the platform and the [`SchedPolicy`]: on unix
/// the realtime policies use `sched_param` levels clamped into the policy's
/// valid range, the timeshare policy uses nice levels; on Windows the classes
/// map onto `THREAD_PRIORITY_*`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ThreadPriority {
    /// Lowest OS priority.
    Idle,
    /// Below-normal tier 1.
    Lowest,
    /// Below-normal tier 2.
    BelowNormal,
    /// Default OS priority.
    Normal,
    /// Above-normal tier 1.
    AboveNormal,
    /// Above-normal tier 2.
    Highest,
    /// Highest OS priority.
    TimeCritical,
}

impl Default for ThreadPriority {
    /// Returns [`ThreadPriority::Normal`].
    fn default() -> Self {
        ThreadPriority::Normal
    }
}

impl ThreadPriority {
    /// Returns a short stable label.
    pub fn as_label(self) -> &'static str {
        match self {
            ThreadPriority::Idle => "idle",
            ThreadPriority::Lowest => "lowest",
            ThreadPriority::BelowNormal => "below_normal",
            ThreadPriority::Normal => "normal",
            ThreadPriority::AboveNormal => "above_normal",
            ThreadPriority::Highest => "highest",
            ThreadPriority::TimeCritical => "time_critical",
        }
    }

    /// Level used with the unix realtime policies, before clamping into the
    /// policy's `sched_get_priority_min..=max` range.
    #[cfg(unix)]
    fn rt_level(self) -> i32 {
        match self {
            ThreadPriority::Idle => 0,
            ThreadPriority::Lowest => 5,
            ThreadPriority::BelowNormal => 8,
            ThreadPriority::Normal => 10,
            ThreadPriority::AboveNormal => 20,
            ThreadPriority::Highest => 30,
            ThreadPriority::TimeCritical => 40,
        }
    }

    /// Nice level used under the unix timeshare policy.
    ///
    /// Raising priority above Normal needs privileges; callers treat the
    /// resulting `EPERM` as non-fatal.
    #[cfg(unix)]
    fn nice_level(self) -> i32 {
        match self {
            ThreadPriority::Idle => 19,
            ThreadPriority::Lowest => 10,
            ThreadPriority::BelowNormal => 5,
            ThreadPriority::Normal => 0,
            ThreadPriority::AboveNormal => -5,
            ThreadPriority::Highest => -10,
            ThreadPriority::TimeCritical => -20,
        }
    }
}

/// Portable scheduling-policy selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SchedPolicy {
    /// Platform default (non-realtime).
    Default,
    /// Realtime FIFO (`SCHED_FIFO` on unix).
    RealtimeFifo,
    /// Realtime round-robin (`SCHED_RR` on unix).
    RealtimeRoundRobin,
    /// Non-realtime timesharing (`SCHED_OTHER` on unix).
    NonRealtimeTimeshare,
}

impl Default for SchedPolicy {
    /// Returns [`SchedPolicy::Default`] (non-realtime).
    fn default() -> Self {
        SchedPolicy::Default
    }
}

/// Truncates a thread name to [`MAX_THREAD_NAME_LEN`] bytes, respecting
/// UTF-8 boundaries.
pub(crate) fn truncate_name(name: &str) -> String {
    if name.len() <= MAX_THREAD_NAME_LEN {
        return name.to_string();
    }
    let mut end = MAX_THREAD_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].to_string()
}

/// Applies `priority` under `policy` to the calling thread.
///
/// Errors are surfaced to the caller; a worker that cannot raise its own
/// priority logs the failure and keeps running at the default one.
#[cfg(unix)]
pub fn set_current_thread_priority(priority: ThreadPriority, policy: SchedPolicy) -> io::Result<()> {
    match policy {
        SchedPolicy::Default | SchedPolicy::NonRealtimeTimeshare => {
            // SCHED_OTHER ignores sched_param; the level is expressed as niceness.
            let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS as _, 0, priority.nice_level()) };
            if rc != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        }
        SchedPolicy::RealtimeFifo | SchedPolicy::RealtimeRoundRobin => {
            let native = match policy {
                SchedPolicy::RealtimeFifo => libc::SCHED_FIFO,
                _ => libc::SCHED_RR,
            };
            let min = unsafe { libc::sched_get_priority_min(native) };
            let max = unsafe { libc::sched_get_priority_max(native) };
            if min < 0 || max < 0 {
                return Err(io::Error::last_os_error());
            }
            let param = libc::sched_param {
                sched_priority: priority.rt_level().clamp(min, max),
            };
            let rc = unsafe { libc::pthread_setschedparam(libc::pthread_self(), native, &param) };
            if rc != 0 {
                return Err(io::Error::from_raw_os_error(rc));
            }
            Ok(())
        }
    }
}

/// Applies `priority` to the calling thread. Windows has no per-thread
/// scheduling policy selector; `policy` is ignored.
#[cfg(windows)]
pub fn set_current_thread_priority(priority: ThreadPriority, _policy: SchedPolicy) -> io::Result<()> {
    use windows::Win32::System::Threading::{
        GetCurrentThread, SetThreadPriority, THREAD_PRIORITY_ABOVE_NORMAL,
        THREAD_PRIORITY_BELOW_NORMAL, THREAD_PRIORITY_HIGHEST, THREAD_PRIORITY_IDLE,
        THREAD_PRIORITY_LOWEST, THREAD_PRIORITY_NORMAL, THREAD_PRIORITY_TIME_CRITICAL,
    };

    let native = match priority {
        ThreadPriority::Idle => THREAD_PRIORITY_IDLE,
        ThreadPriority::Lowest => THREAD_PRIORITY_LOWEST,
        ThreadPriority::BelowNormal => THREAD_PRIORITY_BELOW_NORMAL,
        ThreadPriority::Normal => THREAD_PRIORITY_NORMAL,
        ThreadPriority::AboveNormal => THREAD_PRIORITY_ABOVE_NORMAL,
        ThreadPriority::Highest => THREAD_PRIORITY_HIGHEST,
        ThreadPriority::TimeCritical => THREAD_PRIORITY_TIME_CRITICAL,
    };
    unsafe { SetThreadPriority(GetCurrentThread(), native) }.map_err(io::Error::other)
}

#[cfg(not(any(unix, windows)))]
pub fn set_current_thread_priority(
    _priority: ThreadPriority,
    _policy: SchedPolicy,
) -> io::Result<()> {
    Ok(())
}

/// Sets the OS-level name of the calling thread (truncated to
/// [`MAX_THREAD_NAME_LEN`] bytes).
pub fn set_current_thread_name(name: &str) {
    let truncated = truncate_name(name);

    #[cfg(target_os = "linux")]
    {
        if let Ok(cname) = std::ffi::CString::new(truncated) {
            unsafe {
                libc::pthread_setname_np(libc::pthread_self(), cname.as_ptr());
            }
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(cname) = std::ffi::CString::new(truncated) {
            unsafe {
                libc::pthread_setname_np(cname.as_ptr());
            }
        }
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        let _ = truncated;
    }
}

/// Returns the name of the calling thread, if it has one.
pub fn current_thread_name() -> Option<String> {
    std::thread::current().name().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names_pass_through() {
        assert_eq!(truncate_name("heartbeat"), "heartbeat");
        assert_eq!(truncate_name("exactly-15-byte"), "exactly-15-byte");
    }

    #[test]
    fn long_names_are_cut_at_15_bytes() {
        let cut = truncate_name("a-rather-long-worker-name");
        assert_eq!(cut.len(), MAX_THREAD_NAME_LEN);
        assert_eq!(cut, "a-rather-long-w");
    }

    #[test]
    fn truncation_respects_utf8_boundaries() {
        let cut = truncate_name("wörker-ünit-täsk");
        assert!(cut.len() <= MAX_THREAD_NAME_LEN);
        assert!(std::str::from_utf8(cut.as_bytes()).is_ok());
    }

    #[test]
    fn defaults_are_non_realtime_normal() {
        assert_eq!(ThreadPriority::default(), ThreadPriority::Normal);
        assert_eq!(SchedPolicy::default(), SchedPolicy::Default);
    }

    #[test]
    fn priority_classes_are_ordered() {
        assert!(ThreadPriority::Idle < ThreadPriority::Normal);
        assert!(ThreadPriority::Normal < ThreadPriority::TimeCritical);
        assert_eq!(ThreadPriority::AboveNormal.as_label(), "above_normal");
    }

    #[test]
    fn current_thread_can_be_named_and_read() {
        std::thread::Builder::new()
            .name("tv-name-test".into())
            .spawn(|| {
                // OS-level rename, including the truncation path; the
                // std-level name is fixed at spawn.
                set_current_thread_name("tv-name-test-renamed-long");
                assert_eq!(current_thread_name().as_deref(), Some("tv-name-test"));
            })
            .expect("spawn")
            .join()
            .expect("join");
    }
}

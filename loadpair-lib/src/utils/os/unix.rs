use rama::telemetry::tracing;

pub use libc::rlim_t;

/// Raise the soft `RLIMIT_NOFILE` limit of this process to `target`,
/// capped by the hard limit. A limit that is already high enough is left as is.
///
/// Both the driver (outbound sockets) and the target (inbound sockets)
/// can easily exceed the common default of 1024 open descriptors.
pub fn raise_nofile(target: rlim_t) -> std::io::Result<()> {
    let mut limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };

    // SAFETY: `limit` is a valid, exclusively borrowed rlimit struct.
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut limit) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    let soft = target.min(limit.rlim_max);
    if limit.rlim_cur >= soft {
        tracing::debug!(
            current = limit.rlim_cur,
            requested = soft,
            "nofile limit already sufficient",
        );
        return Ok(());
    }

    let previous = limit.rlim_cur;
    limit.rlim_cur = soft;

    // SAFETY: `limit` is a valid, initialised rlimit struct.
    if unsafe { libc::setrlimit(libc::RLIMIT_NOFILE, &limit) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    tracing::info!(previous, current = soft, "raised nofile soft limit");
    Ok(())
}

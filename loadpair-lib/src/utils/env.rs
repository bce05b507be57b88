pub const fn project_name() -> &'static str {
    "loadpair"
}

/// Value used for the `Server` header of all loadpair listeners.
pub const fn network_service_identifier() -> &'static str {
    concat!("loadpair/", env!("CARGO_PKG_VERSION"))
}

/// Default worker count when the driver is asked to pick one itself.
pub fn default_concurrency() -> usize {
    std::env::var("LOADPAIR_CONCURRENCY")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|n: &usize| *n > 0)
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
}

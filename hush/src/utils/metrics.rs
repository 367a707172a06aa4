#[cfg(feature = "metrics")]
pub fn measure<T>(label: &str, f: impl FnOnce() -> T) -> T {
    let tt = std::time::Instant::now();
    let val = f();

    log::trace!(
        "{}: {}",
        label,
        humantime::format_duration(tt.elapsed())
    );

    val
}

#[cfg(not(feature = "metrics"))]
pub fn measure<T>(_: &str, f: impl FnOnce() -> T) -> T {
    f()
}

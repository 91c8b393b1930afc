/// Prints messages from the `log` crate to STDERR, defaulting to `info` unless `RUST_LOG` says
/// otherwise. Safe to call more than once; only the first call installs the logger.
pub fn setup() {
    use env_logger::{Builder, Env};
    if Builder::from_env(Env::default().default_filter_or("info"))
        .try_init()
        .is_ok()
    {
        log::debug!("Logger installed");
    }
}

/// Installs a test subscriber that writes through the test harness.
///
/// `RUST_LOG` wins when set; otherwise the given level applies. Thread names
/// are printed since most queue tests involve several threads.
///
/// Usage:
/// - `init_test_tracing!()` - DEBUG unless `RUST_LOG` says otherwise
/// - `init_test_tracing!(TRACE)` - uses the specified level
#[macro_export]
macro_rules! init_test_tracing {
    () => {
        $crate::init_test_tracing!(DEBUG);
    };
    ($level:ident) => {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(tracing::Level::$level.as_str())
                }),
            )
            .with_thread_names(true)
            .with_test_writer()
            .try_init();
    };
}

pub use crate::init_test_tracing;

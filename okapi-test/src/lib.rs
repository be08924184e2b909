//! Miscellaneous test code for Okapi.

// Standard lints
#![warn(missing_docs)]
#![deny(clippy::await_holding_lock)]
#![forbid(unsafe_code)]

use std::sync::Once;

use once_cell::sync::Lazy;
use tracing_error::ErrorLayer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// A multi-threaded Tokio runtime that can be shared between tests.
///
/// Use this runtime in tests that drive async code from a sync test function.
/// A shared runtime should not be used in tests that need to pause and resume
/// the Tokio timer, because multiple tests might be sharing it at the same
/// time.
pub static RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime")
});

static INIT: Once = Once::new();

/// An opaque guard returned by [`init`], held for the duration of a test.
pub struct InitGuard {
    _private: (),
}

/// Initialize globals for tests such as the tracing subscriber and panic /
/// error reporting hooks.
///
/// Bind the returned guard at the top of the test:
///
/// ```
/// let _init_guard = okapi_test::init();
/// ```
pub fn init() -> InitGuard {
    INIT.call_once(|| {
        let fmt_layer = fmt::layer().with_target(false);
        // Use the RUST_LOG env var, or by default:
        //  - warn for most tests, and
        //  - hide the expected warn logs from verifier retries
        let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::try_new("warn")
                .unwrap()
                .add_directive("okapi_verifier=error".parse().unwrap())
        });

        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .with(ErrorLayer::default())
            .init();

        color_eyre::config::HookBuilder::default()
            .add_frame_filter(Box::new(|frames| {
                let filters = &[
                    "tokio::",
                    "<futures_util::",
                    "std::panic",
                    "core::ops::function::FnOnce::call_once",
                    "std::thread::local",
                    "<core::future::",
                    "<alloc::boxed::Box",
                    "test::assert_test_result",
                ];

                frames.retain(|frame| {
                    !filters.iter().any(|f| {
                        let name = if let Some(name) = frame.name.as_ref() {
                            name.as_str()
                        } else {
                            return true;
                        };

                        name.starts_with(f)
                    })
                });
            }))
            .install()
            .unwrap();
    });

    InitGuard { _private: () }
}

/// Initialize globals for tests that drive async code from a sync function,
/// and return the shared runtime handle along with the [`init`] guard.
///
/// ```
/// let (rt, _init_guard) = okapi_test::init_async();
/// rt.block_on(async { /* ... */ });
/// ```
pub fn init_async() -> (&'static tokio::runtime::Runtime, InitGuard) {
    let guard = init();
    (&RUNTIME, guard)
}

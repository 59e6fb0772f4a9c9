// SPDX-License-Identifier: MIT OR Apache-2.0

use std::env;

/// Selects the deadlock detector compiled in as the default for `RwMutex`.
///
/// Precedence: the `GATED_RWLOCK_DETECTOR` environment variable, then the
/// `checked`/`unchecked` features, then the build profile.
fn main() {
    // Declare our custom cfg name so rustc's cfg checking accepts #[cfg(tracking_detector)].
    println!("cargo:rustc-check-cfg=cfg(tracking_detector)");
    println!("cargo:rerun-if-env-changed=GATED_RWLOCK_DETECTOR");

    let from_env = env::var("GATED_RWLOCK_DETECTOR").ok().and_then(|v| {
        match v.trim().to_ascii_lowercase().as_str() {
            "tracking" | "checked" => Some(true),
            "null" | "unchecked" => Some(false),
            other => {
                println!(
                    "cargo:warning=ignoring GATED_RWLOCK_DETECTOR={other:?}; expected \"tracking\" or \"null\""
                );
                None
            }
        }
    });

    let checked = env::var_os("CARGO_FEATURE_CHECKED").is_some();
    let unchecked = env::var_os("CARGO_FEATURE_UNCHECKED").is_some();
    let debug_assertions = env::var_os("CARGO_CFG_DEBUG_ASSERTIONS").is_some();

    let tracking = from_env.unwrap_or(if checked {
        true
    } else if unchecked {
        false
    } else {
        debug_assertions
    });

    if tracking {
        println!("cargo:rustc-cfg=tracking_detector");
    }
}

//! Detached task spawning for native and browser hosts.
//!
//! DESIGN
//! ======
//! Native hosts run on a tokio runtime. A browser page has no tokio
//! reactor, so `hydrate` builds for `wasm32` hand futures to the page's
//! event loop through `wasm_bindgen_futures::spawn_local`. Browser futures
//! (fetch, DOM) are not `Send`, so the bound is relaxed there via
//! [`MaybeSend`].

#[cfg(test)]
#[path = "runtime_test.rs"]
mod tests;

use std::future::Future;

/// `Send` on native targets; no bound in browser builds.
#[cfg(not(all(target_arch = "wasm32", feature = "hydrate")))]
pub trait MaybeSend: Send {}
#[cfg(not(all(target_arch = "wasm32", feature = "hydrate")))]
impl<T: Send> MaybeSend for T {}

/// `Send` on native targets; no bound in browser builds.
#[cfg(all(target_arch = "wasm32", feature = "hydrate"))]
pub trait MaybeSend {}
#[cfg(all(target_arch = "wasm32", feature = "hydrate"))]
impl<T> MaybeSend for T {}

/// Run `fut` to completion in the background. Returns `false` when no
/// executor is available and the future was dropped unpolled.
#[cfg(not(all(target_arch = "wasm32", feature = "hydrate")))]
pub fn spawn_detached<F>(fut: F) -> bool
where
    F: Future<Output = ()> + MaybeSend + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            drop(handle.spawn(fut));
            true
        }
        Err(_) => false,
    }
}

/// Run `fut` to completion on the page's event loop.
#[cfg(all(target_arch = "wasm32", feature = "hydrate"))]
pub fn spawn_detached<F>(fut: F) -> bool
where
    F: Future<Output = ()> + MaybeSend + 'static,
{
    wasm_bindgen_futures::spawn_local(fut);
    true
}

//! Units without a marker: the host's own loading decides the outcome.

use crate::Error;
use crate::element::NativeState;
use crate::registry::ImageUnit;

use super::CacheAsideFetcher;

/// What happened when a native unit was attached
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NativeAttach {
    /// Already finished with content; reported complete
    Complete,
    /// Already finished empty or with an error; reported invalid
    Invalid,
    /// Still loading; a watcher reports when the host signals
    Watching,
}

impl CacheAsideFetcher {
    /// Attach progress reporting to a natively loaded unit
    ///
    /// An element that is already finished is settled synchronously: zero
    /// area counts as a decode failure. Otherwise a watcher task waits for
    /// the host's success or failure signal; the caller does not wait.
    pub(crate) fn attach_native(&self, unit: &ImageUnit) -> NativeAttach {
        let state = unit.element.native_state();

        if state.is_finished() {
            if state.has_area() {
                self.deps.sink.complete(&self.progress_label);
                return NativeAttach::Complete;
            }
            let error = Error::Decode(unit.element.id().to_string());
            tracing::warn!(
                element = %unit.element.id(),
                ?state,
                code = error.error_code(),
                error = %error,
                "natively loaded image finished without content"
            );
            self.deps.sink.invalid(&self.progress_label);
            return NativeAttach::Invalid;
        }

        let element = unit.element.clone();
        let sink = self.deps.sink.clone();
        let label = self.progress_label.clone();
        tokio::spawn(async move {
            match element.wait_native().await {
                NativeState::Loaded { .. } => sink.complete(&label),
                state => {
                    tracing::warn!(element = %element.id(), ?state, "native image load failed");
                    sink.invalid(&label);
                }
            }
        });

        NativeAttach::Watching
    }
}

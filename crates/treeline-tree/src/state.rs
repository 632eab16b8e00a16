//! Controlled/uncontrolled state merging.

/// One axis of controlled/uncontrolled state.
///
/// While a controlled value is present it is authoritative and internal
/// mutation never changes what [`current`](MergedState::current) returns;
/// the owner is expected to observe the change notification and feed the new
/// value back. Without a controlled value, [`commit`](MergedState::commit)
/// takes effect directly.
#[derive(Debug, Clone)]
pub struct MergedState<T> {
    controlled: Option<T>,
    uncontrolled: T,
}

impl<T> MergedState<T> {
    /// Start in uncontrolled mode with the given initial value.
    #[must_use]
    pub fn uncontrolled(initial: T) -> Self {
        Self {
            controlled: None,
            uncontrolled: initial,
        }
    }

    /// The merged value: controlled if present, else the internal value.
    #[must_use]
    pub fn current(&self) -> &T {
        self.controlled.as_ref().unwrap_or(&self.uncontrolled)
    }

    /// Whether a controlled value is currently supplied.
    #[must_use]
    pub fn is_controlled(&self) -> bool {
        self.controlled.is_some()
    }

    /// Supply or withdraw the controlled value.
    pub fn set_controlled(&mut self, value: Option<T>) {
        self.controlled = value;
    }

    /// Record a user-facing mutation. Always updates the internal value; the
    /// caller emits the change notification.
    pub fn commit(&mut self, value: T) {
        self.uncontrolled = value;
    }
}

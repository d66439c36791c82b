// Keywarden — User Triggers
//
// Each sensitive operation waits on an explicit trigger the human presses
// (unlock, confirm). A trigger is only pressable while it is visible and
// enabled, and a press disables it at once so one gesture resolves at most one
// wait.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

use super::InteractionError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriggerState {
    pub visible: bool,
    pub enabled: bool,
    /// Label hint: "create" rather than "unlock" for first-time setup.
    pub create: bool,
}

#[derive(Debug)]
pub struct UserTrigger {
    name: &'static str,
    state: Mutex<TriggerState>,
    presses: watch::Sender<u64>,
}

/// A pending wait on a trigger, created by [`UserTrigger::arm`].
pub struct Armed {
    rx: watch::Receiver<u64>,
}

impl Armed {
    /// Resolve on the next press after arming.
    pub async fn pressed(mut self) -> Result<(), InteractionError> {
        self.rx.changed().await.map_err(|_| InteractionError::Closed)
    }
}

impl UserTrigger {
    pub fn new(name: &'static str) -> Self {
        let (presses, _) = watch::channel(0);
        Self {
            name,
            state: Mutex::new(TriggerState::default()),
            presses,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn lock(&self) -> MutexGuard<'_, TriggerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> TriggerState {
        *self.lock()
    }

    /// Show and enable the trigger and start listening for the next press.
    pub fn arm(&self) -> Armed {
        let rx = self.presses.subscribe();
        let mut state = self.lock();
        state.visible = true;
        state.enabled = true;
        tracing::debug!(trigger = self.name, "Trigger armed");
        Armed { rx }
    }

    /// Press the trigger. Returns false when it is hidden or disabled.
    pub fn press(&self) -> bool {
        {
            let mut state = self.lock();
            if !(state.visible && state.enabled) {
                return false;
            }
            state.enabled = false;
        }
        self.presses.send_modify(|count| *count += 1);
        tracing::debug!(trigger = self.name, "Trigger pressed");
        true
    }

    pub fn enable(&self) {
        self.lock().enabled = true;
    }

    pub fn disable(&self) {
        self.lock().enabled = false;
    }

    pub fn hide(&self) {
        let mut state = self.lock();
        state.visible = false;
        state.enabled = false;
    }

    pub fn set_create(&self, create: bool) {
        self.lock().create = create;
    }
}

/// The enclave's two affordances.
#[derive(Debug, Clone)]
pub struct Triggers {
    pub unlock: Arc<UserTrigger>,
    pub confirm: Arc<UserTrigger>,
}

impl Default for Triggers {
    fn default() -> Self {
        Self::new()
    }
}

impl Triggers {
    pub fn new() -> Self {
        Self {
            unlock: Arc::new(UserTrigger::new("unlock")),
            confirm: Arc::new(UserTrigger::new("confirm")),
        }
    }

    pub fn hide_all(&self) {
        self.unlock.hide();
        self.confirm.hide();
    }

    /// Re-enable whichever triggers are still shown, so the human can retry.
    pub fn enable_all(&self) {
        for trigger in [&self.unlock, &self.confirm] {
            let mut state = trigger.lock();
            if state.visible {
                state.enabled = true;
            }
        }
    }

    /// Press whichever trigger is currently pressable, returning its name.
    pub fn press_active(&self) -> Option<&'static str> {
        [&self.unlock, &self.confirm]
            .into_iter()
            .find(|trigger| trigger.press())
            .map(|trigger| trigger.name())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_hidden_trigger_cannot_be_pressed() {
        let trigger = UserTrigger::new("unlock");
        assert!(!trigger.press(), "A trigger that was never armed must ignore presses");
    }

    #[test]
    fn test_press_disables_trigger() {
        let trigger = UserTrigger::new("confirm");
        let _armed = trigger.arm();
        assert!(trigger.press());
        assert!(!trigger.state().enabled);
        assert!(!trigger.press(), "Second press must be ignored until re-enabled");
    }

    #[tokio::test]
    async fn test_armed_wait_resolves_on_press() {
        let trigger = Arc::new(UserTrigger::new("unlock"));
        let armed = trigger.arm();

        let presser = trigger.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            presser.press();
        });

        tokio::time::timeout(Duration::from_secs(2), armed.pressed())
            .await
            .expect("press should resolve the wait")
            .unwrap();
    }

    #[tokio::test]
    async fn test_press_before_arming_is_not_replayed() {
        let trigger = UserTrigger::new("unlock");
        let first = trigger.arm();
        trigger.press();
        first.pressed().await.unwrap();

        trigger.enable();
        let second = trigger.arm();
        let waited = tokio::time::timeout(Duration::from_millis(30), second.pressed()).await;
        assert!(waited.is_err(), "An old press must not satisfy a new wait");
    }

    #[test]
    fn test_hide_all_and_enable_all() {
        let triggers = Triggers::new();
        let _armed = triggers.confirm.arm();
        triggers.confirm.disable();

        triggers.enable_all();
        assert!(triggers.confirm.state().enabled);
        assert!(
            !triggers.unlock.state().enabled,
            "Hidden triggers stay disabled"
        );

        triggers.hide_all();
        assert_eq!(triggers.confirm.state().visible, false);
        assert_eq!(triggers.confirm.state().enabled, false);
    }

    #[test]
    fn test_press_active_picks_armed_trigger() {
        let triggers = Triggers::new();
        assert_eq!(triggers.press_active(), None);
        let _armed = triggers.confirm.arm();
        assert_eq!(triggers.press_active(), Some("confirm"));
    }
}

use crate::event::GameEvent;

/// Runs for a claim that has not enabled the rule: the event does not
/// happen there.
pub fn suppress(event: &mut GameEvent) {
    event.cancel();
}

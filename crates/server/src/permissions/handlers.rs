//! Permission handlers. Each returns true when it acted on the event (and
//! cancelled it), false when this particular occurrence is not its business.

use crate::block;
use crate::event::GameEvent;

pub fn deny(event: &mut GameEvent) -> bool {
    event.cancel();
    true
}

fn deny_if(event: &mut GameEvent, applies: bool) -> bool {
    if applies {
        event.cancel();
    }
    applies
}

/// Breaking anything except a crop. Crops fall through to harvest.
pub fn break_non_crop(event: &mut GameEvent) -> bool {
    let applies = !event.block_is(block::is_crop);
    deny_if(event, applies)
}

pub fn break_crop(event: &mut GameEvent) -> bool {
    let applies = event.block_is(block::is_crop);
    deny_if(event, applies)
}

pub fn open_container(event: &mut GameEvent) -> bool {
    let applies = event.block_is(block::is_container);
    deny_if(event, applies)
}

pub fn edit_sign(event: &mut GameEvent) -> bool {
    let applies = event.block_is(block::is_sign);
    deny_if(event, applies)
}

pub fn use_redstone(event: &mut GameEvent) -> bool {
    let applies = event.block_is(block::is_redstone_component);
    deny_if(event, applies)
}

pub fn open_door(event: &mut GameEvent) -> bool {
    let applies = event.block_is(block::is_door);
    deny_if(event, applies)
}

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::sync::hub::RoomHub;

/* ------------ shared room hub ------------
 * One lock for the whole hub: every action runs start-to-finish under it. */
pub type SharedHub = Arc<Mutex<RoomHub>>;

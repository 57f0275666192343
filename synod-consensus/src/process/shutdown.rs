use tracing::debug;

use super::core::Process;

impl Process {
    pub(super) fn on_stop(&mut self) -> bool {
        debug!("🔴 {} received stop", self.id);
        false
    }
}

//! Kernel admin commands typed in the testing channel.
//!
//! - `Fairylab.reload(path,name)` reinstalls one plugin.
//! - `Fairylab.reboot()` asks the runtime to restart the process.
//! - `Fairylab.shutdown()` asks the runtime to exit.

use chrono::{DateTime, Local};
use fairylab_core::SlackMessage;
use tracing::{info, warn};

use super::{Fairylab, KernelSignal};

/// Class name the admin commands are addressed to.
pub const KERNEL_CLASS: &str = "Fairylab";

impl Fairylab {
    pub(super) fn handle_admin(&mut self, message: &SlackMessage, date: DateTime<Local>) {
        let Some(parsed) = self.admin.as_ref().and_then(|s| s.parse(&message.text)) else {
            return;
        };
        if message.channel != self.env.testing_channel() {
            return;
        }

        let reply = match (parsed.method.as_str(), parsed.args.as_slice()) {
            ("reload", [path, name]) => match self.reload(path, name, date) {
                Ok(()) => format!("Reloaded {name}."),
                Err(e) => format!("Failed to reload {name}: {e}"),
            },
            ("reboot", []) => {
                info!("Reboot requested");
                self.signal = Some(KernelSignal::Reboot);
                "Rebooting.".to_owned()
            }
            ("shutdown", []) => {
                info!("Shutdown requested");
                self.signal = Some(KernelSignal::Shutdown);
                "Shutting down.".to_owned()
            }
            (method, args) => {
                warn!(command = %method, args = args.len(), "Unknown admin command");
                return;
            }
        };

        if let Err(e) = self.env.chat().post_message(&message.channel, &reply, &[]) {
            warn!(error = %e, "Failed to confirm admin command");
        }
    }
}

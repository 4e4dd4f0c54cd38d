use crate::domain_model::Notice;
use crate::domain_port::Notifier;
use tracing::warn;

/// Reports notices as warn-level log lines. Used where no UI is attached.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl TracingNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        warn!(title = %notice.title, "{}", notice.message);
    }
}

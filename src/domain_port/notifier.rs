use crate::domain_model::Notice;

/// Surfaces non-fatal warnings to whoever is watching (a toast, a log line).
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

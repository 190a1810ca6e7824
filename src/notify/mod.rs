//! Outbound notifications

mod message;
mod recording;
mod telegram;
mod traits;

pub use message::{company_name, record_link, render_alert, render_overflow};
pub use recording::RecordingNotifier;
pub use telegram::TelegramNotifier;
pub use traits::{DisabledNotifier, Notifier, NotifyError};

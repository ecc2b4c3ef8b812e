pub mod busy;
pub mod confirm;
pub mod connectivity;
pub mod notify;

pub use busy::BusyStateController;
pub use confirm::{ConfirmationPrompt, Dismissal, FadeModal, ModalWidget, PromptHandle};
pub use connectivity::ConnectivityMonitor;
pub use notify::{NotificationCenter, NotificationHandle, Phase};

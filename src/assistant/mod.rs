//! Assistant module - answers reference questions and routes the replies.

pub mod content;
pub mod dataset;
pub mod interaction;
pub mod keyboard;
pub mod messenger;
pub mod router;
pub mod telegram;
pub mod topic;

pub use content::ContentRepository;
pub use dataset::ReferenceDataset;
pub use interaction::Interaction;
pub use messenger::Messenger;
pub use router::DeliveryRouter;
pub use telegram::{TelegramClient, interaction_from_callback, interaction_from_message};

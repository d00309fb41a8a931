// External collaborators, consumed as black boxes behind traits: content
// moderation, realtime notification push, transactional mail, media storage
// and the OAuth identity provider.

use once_cell::sync::Lazy;

pub mod github;
pub mod mailer;
pub mod moderation;
pub mod realtime;
pub mod storage;

/// One connection pool shared by every outbound HTTP client.
pub(crate) static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

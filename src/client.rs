mod console;
mod email_client;
mod resend;
mod turnstile;

pub use console::{ConsoleEmailSender, DisabledEmailSender};
pub use email_client::{Email, EmailAuthorizationToken, EmailSender, PostmarkClient};
pub use resend::ResendClient;
pub use turnstile::{ChallengeError, TurnstileClient};

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType, transport::smtp::authentication::Credentials,
};
use std::sync::{Arc, Mutex};

use crate::config::AppConfig;
use crate::models::Item;

// 1. Mailer Contract
/// Mailer
///
/// Defines the abstract contract for outgoing notification email. Like the
/// storage layer, the concrete implementation is swappable: the real SMTP
/// transport (SmtpMailer) in production, a recording mock (MockMailer) in tests.
///
/// Delivery is always fire-and-forget from the handlers' perspective: a failed
/// send is logged and never fails the HTTP request that triggered it.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends a plain-text email to a single recipient.
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), String>;
}

/// MailerState
///
/// The concrete type used to share the mail service access across the application state.
pub type MailerState = Arc<dyn Mailer>;

/// send_in_background
///
/// Spawns the actual SMTP conversation onto the runtime so the calling handler
/// returns immediately. No retry or ordering guarantee; failures are logged.
pub fn send_in_background(mailer: MailerState, to: String, subject: String, body: String) {
    tokio::spawn(async move {
        if let Err(e) = mailer.send(&to, &subject, &body).await {
            tracing::error!("Failed to send email to {}: {}", to, e);
        } else {
            tracing::info!("Email sent to {}: {}", to, subject);
        }
    });
}

// 2. The Real Implementation (SMTP via lettre)
/// SmtpMailer
///
/// Sends mail through the configured SMTP relay using lettre's async transport.
/// STARTTLS is used when the config demands it (production); the local mail
/// catcher (MailHog/Mailpit) runs without TLS.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    /// new
    ///
    /// Builds the transport from AppConfig. Credentials are attached only when a
    /// username is configured, so the anonymous local relay keeps working.
    pub fn new(config: &AppConfig) -> Result<Self, String> {
        let mut builder = if config.smtp_starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .map_err(|e| e.to_string())?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        };

        builder = builder.port(config.smtp_port);

        if !config.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from_address: config.smtp_from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), String> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| format!("Invalid from address: {}", self.from_address))?,
            )
            .to(to
                .parse()
                .map_err(|_| format!("Invalid recipient address: {}", to))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| e.to_string())?;

        self.transport.send(email).await.map_err(|e| e.to_string())?;
        Ok(())
    }
}

// 3. The Mock Implementation (For Unit Tests)
/// MockMailer
///
/// Records every send so tests can assert on recipients, subjects and bodies
/// without a network connection.
#[derive(Default)]
pub struct MockMailer {
    pub should_fail: bool,
    pub sent: Mutex<Vec<(String, String, String)>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            sent: Mutex::new(vec![]),
        }
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), String> {
        if self.should_fail {
            return Err("Mock Mailer Error: Simulation requested".to_string());
        }
        self.sent
            .lock()
            .expect("mailer mock lock poisoned")
            .push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

// --- Notification Bodies ---

fn item_type_display(item_type: &str) -> &'static str {
    match item_type {
        "lost" => "Lost Item",
        _ => "Found Item",
    }
}

/// item_pending_email
///
/// Sent to the poster right after submission, confirming the listing is in the
/// moderation queue.
pub fn item_pending_email(item: &Item, user_name: &str) -> (String, String) {
    let type_display = item_type_display(&item.item_type);
    let subject = format!("Your {} is pending for approval - PalSU HanApp", type_display);
    let body = format!(
        "Hello {},\n\n\
         Thank you for posting your {} \"{}\" on PalSU HanApp!\n\n\
         Your item has been submitted and is currently pending for approval. \
         You will receive another email once it has been reviewed.\n\n\
         Item Details:\n\
         - Title: {}\n\
         - Category: {}\n\
         - Location: {}\n\
         - Date: {}\n\n\
         Thank you for using PalSU HanApp\n\n\
         ---\n\
         This is an automated message from PalSU HanApp Lost and Found System\n",
        user_name,
        type_display,
        item.title,
        item.title,
        item.category,
        item.location,
        item.date.format("%B %d, %Y"),
    );
    (subject, body)
}

/// item_approved_email
///
/// Sent to the poster once an admin approves the listing. Includes a link to the
/// now-public browse page.
pub fn item_approved_email(item: &Item, user_name: &str, base_url: &str) -> (String, String) {
    let type_display = item_type_display(&item.item_type);
    let subject = format!("Your {} has been approved! - PalSU HanApp", type_display);
    let item_url = format!("{}/{}", base_url.trim_end_matches('/'), item.item_type);
    let body = format!(
        "Hello {},\n\n\
         Great news! Your {} \"{}\" has been approved and is now visible to everyone \
         on PalSU HanApp.\n\n\
         Your item is now live and other users can see your post and contact you if \
         they have information about your item.\n\n\
         View your item: {}\n\n\
         What happens next?\n\
         - Your post is now publicly visible to all PalSU users\n\
         - Interested users can contact you through the app\n\
         - You'll receive email notifications when someone messages you\n\
         - You can edit or manage your post anytime from your dashboard\n\n\
         Thank you for using PalSU HanApp - together we're helping PalSUans reunite \
         with their belongings!\n\n\
         ---\n\
         This is an automated message from PalSU HanApp Lost and Found System\n",
        user_name, type_display, item.title, item_url,
    );
    (subject, body)
}

/// item_rejected_email
pub fn item_rejected_email(item: &Item, user_name: &str) -> (String, String) {
    let type_display = item_type_display(&item.item_type);
    let subject = format!("Your {} submission - PalSU HanApp", type_display);
    let body = format!(
        "Hello {},\n\n\
         We've reviewed your {} \"{}\" and unfortunately it does not meet our posting \
         guidelines at this time.\n\n\
         Common reasons for rejection:\n\
         - Insufficient or unclear description\n\
         - Inappropriate content\n\
         - Duplicate posting\n\
         - Missing required information\n\
         - Item does not belong to PSU community\n\n\
         What you can do:\n\
         - Review our posting guidelines\n\
         - Submit a new post with more detailed information\n\
         - Contact our admin team if you have questions\n\n\
         Thank you for your understanding and for using PalSU HanApp.\n\n\
         ---\n\
         This is an automated message from PalSU HanApp Lost and Found System\n",
        user_name, type_display, item.title,
    );
    (subject, body)
}

/// new_message_email
///
/// Sent to the recipient of an in-app message so conversations are not missed.
pub fn new_message_email(
    item_title: &str,
    sender_email: &str,
    message_subject: &str,
    base_url: &str,
) -> (String, String) {
    let subject = format!("New message about \"{}\" - PalSU HanApp", item_title);
    let inbox_url = format!("{}/messages", base_url.trim_end_matches('/'));
    let body = format!(
        "Hello,\n\n\
         {} sent you a message about the item \"{}\":\n\n\
         Subject: {}\n\n\
         Read and reply in your inbox: {}\n\n\
         ---\n\
         This is an automated message from PalSU HanApp Lost and Found System\n",
        sender_email, item_title, message_subject, inbox_url,
    );
    (subject, body)
}

/// item_completed_email
///
/// Sent to the poster when their listing is marked claimed/recovered.
pub fn item_completed_email(item: &Item, user_name: &str) -> (String, String) {
    let type_display = item_type_display(&item.item_type);
    let outcome = if item.completion == "claimed" {
        "claimed by its owner"
    } else {
        "recovered"
    };
    let subject = format!("Your {} has been resolved - PalSU HanApp", type_display);
    let body = format!(
        "Hello {},\n\n\
         Your {} \"{}\" has been marked as {}. It now appears in the success stories \
         section of PalSU HanApp.\n\n\
         Thank you for helping a fellow PalSUan!\n\n\
         ---\n\
         This is an automated message from PalSU HanApp Lost and Found System\n",
        user_name, type_display, item.title, outcome,
    );
    (subject, body)
}

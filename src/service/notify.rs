use std::sync::Arc;

use url::Url;

use crate::client::{Email, EmailSender};
use crate::domain::{Campaign, EmailAddress};

/// A coupon handed to a subscriber, with the campaign it belongs to
#[derive(Debug, Clone)]
pub struct IssuedCoupon {
    pub code: String,
    pub campaign: Campaign,
    /// `false` when the coupon already existed and was re-issued
    pub created: bool,
}

/// Renders and delivers the coupon email
pub struct Notifier {
    sender: Arc<dyn EmailSender>,
    public_url: Url,
}

impl Notifier {
    pub fn new(sender: Arc<dyn EmailSender>, public_url: Url) -> Self {
        Self { sender, public_url }
    }

    /// Send the coupon email; delivery problems are logged and reported as `false`
    #[tracing::instrument(name = "Send coupon email", skip(self, coupons))]
    pub async fn send_coupons(&self, recipient: &EmailAddress, coupons: &[IssuedCoupon]) -> bool {
        let email = self.render(coupons);
        match self.sender.send(recipient, &email).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error.cause_chain = ?e, "Failed to send coupon email");
                false
            }
        }
    }

    pub fn render(&self, coupons: &[IssuedCoupon]) -> Email {
        let subject = if coupons.len() > 1 {
            "Your MahiTek Lab coupons".to_string()
        } else {
            "Your MahiTek Lab welcome coupon".to_string()
        };

        let html_items: String = coupons
            .iter()
            .map(|c| {
                format!(
                    "<li><strong>{}</strong>: {} ({})</li>",
                    c.code,
                    escape_html(&c.campaign.discount_label()),
                    escape_html(&c.campaign.name)
                )
            })
            .collect();
        let text_items: String = coupons
            .iter()
            .map(|c| {
                format!(
                    "  {}: {} ({})\n",
                    c.code,
                    c.campaign.discount_label(),
                    c.campaign.name
                )
            })
            .collect();

        let html_body = format!(
            "<h1>Thanks for subscribing!</h1>\
             <p>Use these codes at checkout:</p><ul>{}</ul>\
             <p><a href=\"{}\">Visit the shop</a></p>",
            html_items, self.public_url
        );
        let text_body = format!(
            "Thanks for subscribing!\n\nUse these codes at checkout:\n{}\nVisit the shop: {}",
            text_items, self.public_url
        );

        Email {
            subject,
            html_body,
            text_body,
        }
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

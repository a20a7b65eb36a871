//! Mail message rendering.

use common::{Locale, TravelOrderStatus};
use store::{TravelOrder, User};

/// A call-to-action button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAction {
    pub label: String,
    pub url: String,
}

/// A rendered, transport-agnostic email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub greeting: String,
    /// Paragraphs shown before the action.
    pub intro: Vec<String>,
    pub action: Option<MailAction>,
    /// Paragraphs shown after the action.
    pub outro: Vec<String>,
}

impl MailMessage {
    /// Renders the status-change notice sent to the order's owner.
    pub fn status_changed(
        order: &TravelOrder,
        recipient: &User,
        from: TravelOrderStatus,
        to: TravelOrderStatus,
        app_url: &str,
        locale: Locale,
    ) -> Self {
        let url = format!(
            "{}/app/travel-orders/{}",
            app_url.trim_end_matches('/'),
            order.id
        );
        let to_label = to.label(locale);
        let from_label = from.label(locale);

        let (subject, greeting, order_line, action, closing) = match locale {
            Locale::En => (
                format!("Your travel order was {}", to_label.to_lowercase()),
                format!("Hello, {}", recipient.name),
                format!("Order #{}, destination: {}", order.id, order.destination),
                "View order",
                "If you have any questions, contact support.",
            ),
            Locale::PtBr => (
                format!("Seu pedido de viagem foi {}", to_label.to_lowercase()),
                format!("Olá, {}", recipient.name),
                format!("Pedido #{}, destino: {}", order.id, order.destination),
                "Ver pedido",
                "Qualquer dúvida, fale com o suporte.",
            ),
        };

        Self {
            to_email: recipient.email.clone(),
            to_name: recipient.name.clone(),
            subject,
            greeting,
            intro: vec![order_line, format!("Status: {from_label} → {to_label}")],
            action: Some(MailAction {
                label: action.to_string(),
                url,
            }),
            outro: vec![closing.to_string()],
        }
    }

    /// Plain-text body.
    pub fn text_body(&self) -> String {
        let mut body = vec![self.greeting.clone(), String::new()];
        body.extend(self.intro.iter().cloned());
        if let Some(ref action) = self.action {
            body.push(String::new());
            body.push(format!("{}: {}", action.label, action.url));
        }
        if !self.outro.is_empty() {
            body.push(String::new());
            body.extend(self.outro.iter().cloned());
        }
        body.join("\n")
    }
}

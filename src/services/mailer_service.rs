use crate::config::Config;
use crate::error::{Error, Result};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Outbound transactional mail, delivered through an HTTP mail API.
/// Every send is fire-and-forget: dispatched on its own task after the
/// triggering state change has committed, with failures logged and never
/// surfaced to the HTTP client.
#[derive(Clone)]
pub struct MailerService {
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
    reply_to: String,
    jury_email: String,
    webapp_url: String,
}

impl MailerService {
    pub fn new(config: &Config) -> Self {
        // Short timeout: a slow mail transport must not stall anything.
        let client = Client::builder()
            .timeout(Duration::from_secs(config.mail_timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_url: config.mail_api_url.clone(),
            api_key: config.mail_api_key.clone(),
            from: config.mail_from.clone(),
            reply_to: config.mail_reply_to.clone(),
            jury_email: config.jury_email.clone(),
            webapp_url: config.webapp_url.clone(),
        }
    }

    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<()> {
        let payload = json!({
            "from": self.from,
            "reply_to": self.reply_to,
            "to": [to],
            "subject": subject,
            "html": html,
        });

        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Internal(format!(
                "mail API returned {}: {}",
                status, body
            )));
        }
        Ok(())
    }

    /// Spawns the send on its own task; the caller never waits on delivery.
    fn dispatch(&self, to: String, subject: String, html: String, context: &'static str) {
        let mailer = self.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&to, &subject, &html).await {
                tracing::error!(to = %to, context, error = ?e, "mail delivery failed");
            } else {
                tracing::info!(to = %to, context, "mail delivered");
            }
        });
    }

    pub fn step2_link(&self, token: &str) -> String {
        format!("{}/soumission?token={}", self.webapp_url, token)
    }

    pub fn dispatch_registration_received(&self, to: &str, prenom: &str, langue: &str) {
        let (subject, html) = compose_registration_received(prenom, langue);
        self.dispatch(to.to_string(), subject, html, "registration_received");
    }

    pub fn dispatch_approved(&self, to: &str, prenom: &str, langue: &str, token: &str) {
        let link = self.step2_link(token);
        let (subject, html) = compose_approved(prenom, langue, &link);
        self.dispatch(to.to_string(), subject, html, "candidature_approved");
    }

    pub fn dispatch_rejected(&self, to: &str, prenom: &str, langue: &str) {
        let (subject, html) = compose_rejected(prenom, langue);
        self.dispatch(to.to_string(), subject, html, "candidature_rejected");
    }

    pub fn dispatch_submission_confirmed(&self, to: &str, prenom: &str, langue: &str) {
        let (subject, html) = compose_submission_confirmed(prenom, langue);
        self.dispatch(to.to_string(), subject, html, "submission_confirmed");
    }

    pub fn dispatch_jury_new_registration(&self, nom: &str, prenom: &str, email: &str) {
        let subject = "Nouvelle inscription au concours".to_string();
        let html = format!(
            "<p>Nouvelle inscription : <strong>{} {}</strong> ({}).</p>\
             <p>La candidature attend votre examen.</p>",
            prenom, nom, email
        );
        self.dispatch(self.jury_email.clone(), subject, html, "jury_new_registration");
    }

    pub fn dispatch_jury_new_submission(&self, nom: &str, prenom: &str, email: &str) {
        let subject = "Nouveau dossier de projet soumis".to_string();
        let html = format!(
            "<p>Le candidat <strong>{} {}</strong> ({}) a soumis son dossier de projet.</p>",
            prenom, nom, email
        );
        self.dispatch(self.jury_email.clone(), subject, html, "jury_new_submission");
    }
}

fn compose_registration_received(prenom: &str, langue: &str) -> (String, String) {
    if langue == "en" {
        (
            "Registration received".to_string(),
            format!(
                "<p>Dear {},</p>\
                 <p>Your registration has been received. The jury will review your \
                 application and you will be notified of its decision by email.</p>",
                prenom
            ),
        )
    } else {
        (
            "Inscription bien reçue".to_string(),
            format!(
                "<p>Bonjour {},</p>\
                 <p>Votre inscription a bien été enregistrée. Le jury examinera votre \
                 candidature et vous serez informé de sa décision par courriel.</p>",
                prenom
            ),
        )
    }
}

fn compose_approved(prenom: &str, langue: &str, link: &str) -> (String, String) {
    if langue == "en" {
        (
            "Application approved — submit your project".to_string(),
            format!(
                "<p>Dear {},</p>\
                 <p>Your application has been approved. You may now submit your \
                 project dossier using your personal link:</p>\
                 <p><a href=\"{}\">{}</a></p>\
                 <p>This link can be used only once.</p>",
                prenom, link, link
            ),
        )
    } else {
        (
            "Candidature approuvée — soumettez votre projet".to_string(),
            format!(
                "<p>Bonjour {},</p>\
                 <p>Votre candidature a été approuvée. Vous pouvez maintenant soumettre \
                 votre dossier de projet via votre lien personnel :</p>\
                 <p><a href=\"{}\">{}</a></p>\
                 <p>Ce lien ne peut être utilisé qu'une seule fois.</p>",
                prenom, link, link
            ),
        )
    }
}

fn compose_rejected(prenom: &str, langue: &str) -> (String, String) {
    if langue == "en" {
        (
            "Application outcome".to_string(),
            format!(
                "<p>Dear {},</p>\
                 <p>After review, the jury was unable to retain your application. \
                 Thank you for your interest in the competition.</p>",
                prenom
            ),
        )
    } else {
        (
            "Suite de votre candidature".to_string(),
            format!(
                "<p>Bonjour {},</p>\
                 <p>Après examen, le jury n'a pas pu retenir votre candidature. \
                 Nous vous remercions de l'intérêt porté au concours.</p>",
                prenom
            ),
        )
    }
}

fn compose_submission_confirmed(prenom: &str, langue: &str) -> (String, String) {
    if langue == "en" {
        (
            "Project dossier received".to_string(),
            format!(
                "<p>Dear {},</p>\
                 <p>Your project dossier has been received. Your participation in the \
                 competition is now complete.</p>",
                prenom
            ),
        )
    } else {
        (
            "Dossier de projet bien reçu".to_string(),
            format!(
                "<p>Bonjour {},</p>\
                 <p>Votre dossier de projet a bien été reçu. Votre participation au \
                 concours est maintenant complète.</p>",
                prenom
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_mail_carries_the_access_link() {
        let link = "https://concours.example/soumission?token=abc123";
        let (subject, html) = compose_approved("Awa", "fr", link);
        assert!(subject.contains("approuvée"));
        assert!(html.contains(link));

        let (subject_en, html_en) = compose_approved("Awa", "en", link);
        assert!(subject_en.contains("approved"));
        assert!(html_en.contains(link));
    }

    #[test]
    fn language_defaults_to_french() {
        let (subject, _) = compose_registration_received("Moussa", "de");
        assert!(subject.contains("Inscription"));
    }

    #[test]
    fn rejection_mail_never_mentions_tokens() {
        let (_, html) = compose_rejected("Awa", "fr");
        assert!(!html.contains("token"));
        assert!(!html.contains("soumission?"));
    }
}

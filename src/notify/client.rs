use std::time::Duration;

use reqwest::Client;
use serde_json::json;

use crate::clinic::models::{Appointment, Doctor, Patient};
use crate::config::MailConfig;

/// Posts e-mails to the HTTP mail gateway. Delivery is best effort: failures
/// are logged and swallowed.
#[derive(Clone)]
pub struct Notifier {
    http: Client,
    config: MailConfig,
}

impl Notifier {
    /// Every gateway call is cut off after `config.timeout_secs`.
    pub fn new(config: MailConfig) -> reqwest::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.gateway_url.is_some()
    }

    pub async fn send_booking_confirmation(&self, to: &str, appointment: &Appointment, doctor: &Doctor) {
        let body = format!(
            "Hello {},\n\nYour appointment with {} ({}) on {} at {} has been received and is pending approval.",
            appointment.patient_name, doctor.name, doctor.specialization, appointment.date, appointment.time
        );
        self.send(to, "Appointment request received", &body).await;
    }

    pub async fn send_welcome(&self, patient: &Patient) {
        let body = format!(
            "Welcome {}!\n\nYour patient code is {}.",
            patient.name, patient.patient_code
        );
        self.send(&patient.email, "Welcome to the clinic", &body).await;
    }

    async fn send(&self, to: &str, subject: &str, body: &str) {
        let Some(url) = &self.config.gateway_url else {
            return;
        };

        let mut request = self.http.post(url).json(&json!({
            "from": self.config.from,
            "to": to,
            "subject": subject,
            "body": body,
        }));
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::debug!(%to, %subject, "mail delivered to gateway");
            }
            Ok(resp) => {
                tracing::warn!(%to, %subject, status = %resp.status(), "mail gateway rejected message");
            }
            Err(e) => {
                tracing::warn!(%to, %subject, error = %e, "mail gateway unreachable");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tokio::net::TcpListener;
    use uuid::Uuid;

    use crate::clinic::Role;

    fn patient() -> Patient {
        Patient {
            id: Uuid::new_v4(),
            patient_code: "PAT-000001".into(),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            phone: None,
            gender: None,
            date_of_birth: None,
            address: None,
            password_hash: String::new(),
            role: Role::Patient,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn silent_gateway_is_cut_off_by_the_timeout() {
        // Accepts connections and never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let held = tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                open.push(socket);
            }
        });

        let notifier = Notifier::new(MailConfig {
            gateway_url: Some(format!("http://{addr}/send")),
            token: None,
            from: "no-reply@clinic.local".into(),
            timeout_secs: 1,
        })
        .unwrap();

        let sent = tokio::time::timeout(Duration::from_secs(5), notifier.send_welcome(&patient())).await;
        assert!(sent.is_ok(), "send should give up on its own");
        held.abort();
    }

    #[tokio::test]
    async fn disabled_notifier_returns_immediately() {
        let notifier = Notifier::new(MailConfig {
            gateway_url: None,
            token: None,
            from: "no-reply@clinic.local".into(),
            timeout_secs: 1,
        })
        .unwrap();
        assert!(!notifier.is_enabled());
        notifier.send_welcome(&patient()).await;
    }
}

//! Sends emails over SMTP.

use std::sync::Arc;

use db::DbConn;

use crate::{Notifier, RegistrationNotice};

const SEND_TIMEOUT_SECS: u64 = 15;

pub struct SmtpNotifier {
    operator_email: Option<String>,
}

impl SmtpNotifier {
    /// Returns `None` unless SMTP credentials are present in the
    /// environment (`SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD`,
    /// `SMTP_DOMAIN`).
    pub fn from_env() -> Option<SmtpNotifier> {
        std::env::var("SMTP_HOST").ok()?;
        Some(SmtpNotifier {
            operator_email: std::env::var("OPERATOR_EMAIL").ok(),
        })
    }
}

impl Notifier for SmtpNotifier {
    fn registration_confirmed(
        &self,
        notice: &RegistrationNotice,
        db: Arc<DbConn>,
    ) {
        let name = notice.full_name();
        let html = confirmation_html(notice);
        let text = format!(
            "Dear {},\n\n\
             You are registered for {} at {}. We look forward to seeing \
             you there!\n",
            name, notice.event_title, notice.hub_name
        );

        send_mail(
            vec![(name, notice.email.clone())],
            format!("You're registered: {}", notice.event_title),
            html,
            text,
            db,
        );
    }

    fn operator_alert(&self, notice: &RegistrationNotice, db: Arc<DbConn>) {
        let operator = match &self.operator_email {
            Some(operator) => operator.clone(),
            None => {
                tracing::debug!(
                    "OPERATOR_EMAIL not set, skipping operator alert"
                );
                return;
            }
        };

        let text = format!(
            "New registration for {} at {}:\n\n\
             {} <{}>\ninterests: {}\n",
            notice.event_title,
            notice.hub_name,
            notice.full_name(),
            notice.email,
            notice.interest_areas.join(", "),
        );

        send_mail(
            vec![("Operator".to_string(), operator)],
            format!("New registration: {}", notice.event_title),
            format!("<pre>{}</pre>", text),
            text,
            db,
        );
    }
}

fn confirmation_html(notice: &RegistrationNotice) -> String {
    format!(
        "<p>Dear {},</p>\
         <p>You are registered for <b>{}</b> at <b>{}</b>. We look \
         forward to seeing you there!</p>",
        notice.full_name(),
        notice.event_title,
        notice.hub_name
    )
}

#[cfg(debug_assertions)]
pub fn send_mail(
    _to: Vec<(String, String)>,
    _subject: String,
    _html_contents: String,
    _text_contents: String,
    _db: Arc<DbConn>,
) {
}

#[cfg(not(debug_assertions))]
pub fn send_mail(
    to: Vec<(String, String)>,
    subject: String,
    html_contents: String,
    text_contents: String,
    db: Arc<DbConn>,
) {
    send_mail_internal(to, subject, html_contents, text_contents, db)
}

#[allow(unused)]
fn send_mail_internal(
    to: Vec<(String, String)>,
    subject: String,
    html_contents: String,
    text_contents: String,
    db: Arc<DbConn>,
) {
    use db::schema::emails;
    use diesel::prelude::*;
    use lettre::{
        message::{header::ContentType, MultiPart, SinglePart},
        transport::smtp::authentication::Credentials,
        AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    };
    use uuid::Uuid;

    let mut msg = Message::builder();
    for (name, email) in &to {
        let mailbox = match format!("{name} <{email}>").parse() {
            Ok(mailbox) => mailbox,
            Err(error) => {
                tracing::warn!("unparseable recipient {email}: {error}");
                return;
            }
        };
        msg = msg.to(mailbox);
    }

    let domain = match std::env::var("SMTP_DOMAIN") {
        Ok(domain) => domain,
        Err(_) => {
            tracing::warn!("SMTP_DOMAIN not set, dropping outbound email");
            return;
        }
    };

    let msg_id = format!("{}@{}", Uuid::now_v7(), domain);

    let msg = match msg
        .subject(&subject)
        .message_id(Some(msg_id.clone()))
        .multipart(
            MultiPart::mixed()
                .singlepart(
                    SinglePart::builder()
                        .content_type(ContentType::TEXT_PLAIN)
                        .body(text_contents),
                )
                .singlepart(
                    SinglePart::builder()
                        .content_type(ContentType::TEXT_HTML)
                        .body(html_contents),
                ),
        ) {
        Ok(msg) => msg,
        Err(error) => {
            tracing::warn!("could not compose email: {error}");
            return;
        }
    };

    let (username, password, host) = match (
        std::env::var("SMTP_USERNAME"),
        std::env::var("SMTP_PASSWORD"),
        std::env::var("SMTP_HOST"),
    ) {
        (Ok(username), Ok(password), Ok(host)) => (username, password, host),
        _ => {
            tracing::warn!("incomplete SMTP config, dropping outbound email");
            return;
        }
    };

    let mailer: AsyncSmtpTransport<Tokio1Executor> =
        match AsyncSmtpTransport::<Tokio1Executor>::relay(&host) {
            Ok(builder) => builder
                .credentials(Credentials::new(username, password))
                .build(),
            Err(error) => {
                tracing::warn!("could not build SMTP transport: {error}");
                return;
            }
        };

    let recipients = to
        .iter()
        .map(|(k, v)| format!("{k} <{v}>"))
        .collect::<Vec<_>>()
        .join(",");

    // run in the background; a failed send is logged, never surfaced
    rocket::tokio::spawn(async move {
        let send = rocket::tokio::time::timeout(
            std::time::Duration::from_secs(SEND_TIMEOUT_SECS),
            mailer.send(msg),
        )
        .await;

        match send {
            Ok(Ok(_)) => {}
            Ok(Err(error)) => {
                tracing::warn!("failed to send email {msg_id}: {error}");
                return;
            }
            Err(_) => {
                tracing::warn!("timed out sending email {msg_id}");
                return;
            }
        }

        let log = db
            .run(move |conn| {
                diesel::insert_into(emails::table)
                    .values((
                        emails::message_id.eq(&msg_id),
                        emails::recipients.eq(&recipients),
                    ))
                    .execute(conn)
            })
            .await;

        if let Err(error) = log {
            tracing::warn!("could not record sent email: {error}");
        }
    });
}

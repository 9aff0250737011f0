//! Notification collaborators for the registration flow.
//!
//! A committed registration triggers three independent side effects: a
//! mailing-list upsert, a confirmation email to the registrant, and an
//! alert to the operator address. All of them are best-effort and run
//! off the request path; a failure in any of them is logged and never
//! turns a successful registration into a client-visible error.

pub mod list;
pub mod smtp;

use std::sync::Arc;

use db::DbConn;

/// A snapshot of a committed registration, handed to the collaborators.
#[derive(Debug, Clone)]
pub struct RegistrationNotice {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub event_title: String,
    pub hub_name: String,
    pub interest_areas: Vec<String>,
}

impl RegistrationNotice {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Sends mail about committed registrations.
pub trait Notifier: Send + Sync {
    fn registration_confirmed(
        &self,
        notice: &RegistrationNotice,
        db: Arc<DbConn>,
    );
    fn operator_alert(&self, notice: &RegistrationNotice, db: Arc<DbConn>);
}

/// Stands in when no SMTP credentials are configured.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn registration_confirmed(
        &self,
        notice: &RegistrationNotice,
        _db: Arc<DbConn>,
    ) {
        tracing::debug!(
            "no mailer configured, skipping confirmation to {}",
            notice.email
        );
    }

    fn operator_alert(&self, notice: &RegistrationNotice, _db: Arc<DbConn>) {
        tracing::debug!(
            "no mailer configured, skipping operator alert for {}",
            notice.email
        );
    }
}

/// Keeps an external mailing-list provider in sync with registrations.
pub trait MailingList: Send + Sync {
    fn upsert_contact(&self, notice: &RegistrationNotice);
}

/// Stands in when no list provider is configured.
pub struct NoopMailingList;

impl MailingList for NoopMailingList {
    fn upsert_contact(&self, notice: &RegistrationNotice) {
        tracing::debug!(
            "no mailing list configured, skipping upsert of {}",
            notice.email
        );
    }
}

pub fn notifier_from_env() -> Arc<dyn Notifier> {
    match smtp::SmtpNotifier::from_env() {
        Some(notifier) => Arc::new(notifier),
        None => Arc::new(NoopNotifier),
    }
}

pub fn mailing_list_from_env() -> Arc<dyn MailingList> {
    match list::HttpMailingList::from_env() {
        Some(list) => Arc::new(list),
        None => Arc::new(NoopMailingList),
    }
}

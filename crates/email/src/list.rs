//! Keeps the external mailing-list provider in sync.

use serde::Serialize;

use crate::{MailingList, RegistrationNotice};

const UPSERT_TIMEOUT_SECS: u64 = 10;

pub struct HttpMailingList {
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContactPayload {
    email: String,
    first_name: String,
    last_name: String,
    interest_areas: Vec<String>,
}

impl HttpMailingList {
    /// Returns `None` unless `LIST_API_URL` is present in the
    /// environment. `LIST_API_KEY` is optional (bearer auth).
    pub fn from_env() -> Option<HttpMailingList> {
        Some(HttpMailingList {
            endpoint: std::env::var("LIST_API_URL").ok()?,
            api_key: std::env::var("LIST_API_KEY").ok(),
        })
    }
}

impl MailingList for HttpMailingList {
    fn upsert_contact(&self, notice: &RegistrationNotice) {
        let payload = ContactPayload {
            email: notice.email.clone(),
            first_name: notice.first_name.clone(),
            last_name: notice.last_name.clone(),
            interest_areas: notice.interest_areas.clone(),
        };
        let endpoint = self.endpoint.clone();
        let api_key = self.api_key.clone();

        // run in the background; a failed upsert is logged, never
        // surfaced
        rocket::tokio::spawn(async move {
            let client = match reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(UPSERT_TIMEOUT_SECS))
                .build()
            {
                Ok(client) => client,
                Err(error) => {
                    tracing::warn!("could not build list client: {error}");
                    return;
                }
            };

            let mut request = client.put(&endpoint).json(&payload);
            if let Some(key) = api_key {
                request = request.bearer_auth(key);
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => {
                    tracing::warn!(
                        "mailing list upsert of {} returned {}",
                        payload.email,
                        response.status()
                    );
                }
                Err(error) => {
                    tracing::warn!(
                        "mailing list upsert of {} failed: {error}",
                        payload.email
                    );
                }
            }
        });
    }
}

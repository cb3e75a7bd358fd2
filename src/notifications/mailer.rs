use actix::prelude::*;
use tracing_futures::Instrument;

use crate::config::Config;
use crate::errors::ServiceError;

/// One email to one recipient
#[derive(Message, Debug, Clone, PartialEq, Serialize)]
#[rtype(result = "()")]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Body of the transactional email api
#[derive(Serialize, Debug)]
struct Payload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// `Mailer` delivers emails through a transactional email http api.
///
/// Every email is its own message, a failed delivery is logged and
/// doesn't influence the others. Nothing is retried.
pub struct Mailer {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    from: String,
}

impl Mailer {
    pub fn new(api_url: &str, api_key: Option<&str>, from: &str) -> Mailer {
        Mailer {
            client: reqwest::Client::new(),
            api_url: api_url.to_string(),
            api_key: api_key.map(String::from),
            from: from.to_string(),
        }
    }

    pub fn from_config() -> Mailer {
        if Config::mail_api_key().is_none() {
            warn!("no mail api key configured, emails will only be logged");
        }

        Mailer::new(
            Config::mail_api_url(),
            Config::mail_api_key(),
            Config::mail_from(),
        )
    }

    fn request(&self, email: &Email) -> Option<reqwest::RequestBuilder> {
        let api_key = self.api_key.as_ref()?;

        let request = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&Payload {
                from: &self.from,
                to: &email.to,
                subject: &email.subject,
                html: &email.html,
            });

        Some(request)
    }
}

impl Actor for Mailer {
    type Context = Context<Self>;

    fn started(&mut self, _: &mut Self::Context) {
        debug!("mailer started");
    }
}

impl Handler<Email> for Mailer {
    type Result = ResponseFuture<()>;

    fn handle(&mut self, email: Email, _: &mut Context<Self>) -> Self::Result {
        let request = self.request(&email);
        let span = tracing::info_span!("mailer::send", to = %email.to);

        Box::pin(
            async move {
                let request = match request {
                    Some(request) => request,
                    None => {
                        info!("mail delivery disabled, \"{}\" to {}", email.subject, email.to);
                        return;
                    }
                };

                match deliver(request).await {
                    Ok(()) => debug!("sent \"{}\" to {}", email.subject, email.to),
                    Err(_) => error!("unable to send \"{}\" to {}", email.subject, email.to),
                }
            }
            .instrument(span),
        )
    }
}

async fn deliver(request: reqwest::RequestBuilder) -> Result<(), ServiceError> {
    request.send().await?.error_for_status()?;
    Ok(())
}

/// Hands every email to the mailer without waiting for delivery
pub fn dispatch(mailer: &Addr<Mailer>, emails: Vec<Email>) {
    for email in emails {
        mailer.do_send(email);
    }
}

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, error};
use ureq::{Agent, AgentBuilder, Response};

use crate::{Error, Result};

pub const USER_AGENT: &str = concat!("gbfs2osm ", env!("CARGO_PKG_VERSION"));

pub fn agent() -> Agent {
    AgentBuilder::new()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(60))
        .build()
}

pub fn get_json<T: DeserializeOwned>(agent: &Agent, url: &str) -> Result<T> {
    debug!(%url, "GET");
    read_json(url, agent.get(url).call())
}

pub fn post_form_json<T: DeserializeOwned>(
    agent: &Agent,
    url: &str,
    form: &[(&str, &str)],
) -> Result<T> {
    debug!(%url, "POST");
    read_json(url, agent.post(url).send_form(form))
}

fn read_json<T: DeserializeOwned>(
    url: &str,
    response: Result<Response, ureq::Error>,
) -> Result<T> {
    let response = match response {
        Ok(x) => x,
        Err(ureq::Error::Status(status, response)) => {
            let body = response.into_string().unwrap_or_default();
            error!(%url, status, "HTTP error occurred: {body}");
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status,
                body,
            });
        }
        Err(ureq::Error::Transport(x)) => {
            return Err(Error::Transport {
                url: url.to_string(),
                message: x.to_string(),
            })
        }
    };

    serde_json::from_reader(response.into_reader()).map_err(|e| {
        if e.is_io() {
            Error::Transport {
                url: url.to_string(),
                message: e.to_string(),
            }
        } else {
            Error::data_shape(url, e.to_string())
        }
    })
}

//! Relayer submission: the vote calldata travels in a JSON:API-style
//! envelope and the relayer answers with the transaction handle.

use core::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RelayerConfig;
use crate::error::{RelayerError, RelayerRejection};

const RELAYER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct VoteEnvelope<'a> {
    data: VoteData<'a>,
}

#[derive(Debug, Serialize)]
struct VoteData<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    attributes: VoteAttributes<'a>,
}

#[derive(Debug, Serialize)]
struct VoteAttributes<'a> {
    tx_data: &'a str,
    destination: &'a str,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    data: SubmitData,
}

#[derive(Debug, Deserialize)]
struct SubmitData {
    id: String,
}

pub struct RelayerClient {
    http: reqwest::Client,
    vote_url: String,
}

impl RelayerClient {
    pub fn new(config: &RelayerConfig) -> Self {
        RelayerClient {
            http: reqwest::Client::new(),
            vote_url: config.vote_url.clone(),
        }
    }

    /// POSTs the calldata for the relayer to wrap in a transaction.
    /// Returns the relayer's transaction handle.
    pub async fn submit_vote(
        &self,
        tx_data: &str,
        destination: &str,
    ) -> Result<String, RelayerError> {
        let envelope = VoteEnvelope {
            data: VoteData {
                kind: "vote",
                attributes: VoteAttributes {
                    tx_data,
                    destination,
                },
            },
        };

        let response = self
            .http
            .post(&self.vote_url)
            .timeout(RELAYER_TIMEOUT)
            .json(&envelope)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayerError::Rejected(classify_rejection(&body)));
        }

        let parsed: SubmitResponse = response.json().await?;
        debug!("relayer accepted vote, tx handle {}", parsed.data.id);
        Ok(parsed.data.id)
    }
}

/// The relayer has no error-code contract, so refusals are classified by
/// message content.
pub fn classify_rejection(body: &str) -> RelayerRejection {
    let lower = body.to_lowercase();
    if lower.contains("already voted") || lower.contains("double vot") {
        return RelayerRejection::AlreadyVoted;
    }
    if lower.contains("eligible") || lower.contains("credential") {
        return RelayerRejection::NoEligibleCredential;
    }
    RelayerRejection::Unknown(body.chars().take(200).collect::<String>().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_serializes_to_the_relayer_shape() {
        let envelope = VoteEnvelope {
            data: VoteData {
                kind: "vote",
                attributes: VoteAttributes {
                    tx_data: "0xdead",
                    destination: "0x42",
                },
            },
        };
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["data"]["type"], "vote");
        assert_eq!(value["data"]["attributes"]["tx_data"], "0xdead");
        assert_eq!(value["data"]["attributes"]["destination"], "0x42");
    }

    #[test]
    fn response_handle_deserializes() {
        let parsed: SubmitResponse =
            serde_json::from_str(r#"{"data":{"id":"tx-123","type":"transaction"}}"#).unwrap();
        assert_eq!(parsed.data.id, "tx-123");
    }

    #[test]
    fn rejections_classify_by_message_content() {
        assert_eq!(
            classify_rejection("identity has ALREADY VOTED on this proposal"),
            RelayerRejection::AlreadyVoted
        );
        assert_eq!(
            classify_rejection("no eligible credential found"),
            RelayerRejection::NoEligibleCredential
        );
        assert_eq!(
            classify_rejection("  internal error  "),
            RelayerRejection::Unknown("internal error".to_string())
        );
    }
}

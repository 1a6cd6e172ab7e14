//! Vote submission: one logical task per attempt, four states executed
//! strictly in order. Each state is reported once to the caller-supplied
//! sink; a failure aborts the attempt and carries the state it died in.
//! Nothing here retries: retry policy belongs to the caller, and once the
//! transaction is out there is nothing left to cancel.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::abi;
use crate::calldata;
use crate::citizenship_code;
use crate::config::AppConfig;
use crate::error::VoteError;
use crate::proposal::ProposalInfo;
use crate::prover::{CircuitInputs, ProofGenerator, ZkProof};
use crate::relayer::RelayerClient;
use crate::rpc::{EthRpcClient, RegistrationContract, VotingContract};
use crate::store::VoteStore;
use crate::tx::DevSigner;
use crate::Date;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteProgress {
    BuildingInputs,
    GeneratingProof,
    Submitting,
    Confirmed,
}

#[derive(Debug, Error)]
#[error("vote attempt failed during {stage:?}: {source}")]
pub struct VoteFailure {
    pub stage: VoteProgress,
    #[source]
    pub source: VoteError,
}

#[derive(Debug, Clone)]
pub struct VoteReceipt {
    /// Transaction hash (direct path) or relayer transaction handle.
    pub tx: String,
    pub nullifier: String,
}

pub struct VoteSubmitter<'a> {
    config: &'a AppConfig,
    client: &'a EthRpcClient,
    prover: &'a dyn ProofGenerator,
    store: &'a mut VoteStore,
}

impl<'a> VoteSubmitter<'a> {
    pub fn new(
        config: &'a AppConfig,
        client: &'a EthRpcClient,
        prover: &'a dyn ProofGenerator,
        store: &'a mut VoteStore,
    ) -> Self {
        VoteSubmitter {
            config,
            client,
            prover,
            store,
        }
    }

    /// Runs the full attempt. `selected` holds the chosen option indices;
    /// progress states arrive on `on_progress` in order, each at most once.
    pub async fn cast_vote(
        &mut self,
        proposal: &ProposalInfo,
        selected: &[usize],
        mut on_progress: impl FnMut(VoteProgress),
    ) -> Result<VoteReceipt, VoteFailure> {
        on_progress(VoteProgress::BuildingInputs);
        let inputs = self
            .build_inputs(proposal, selected)
            .await
            .map_err(|source| VoteFailure {
                stage: VoteProgress::BuildingInputs,
                source,
            })?;
        debug!("circuit inputs: {}", inputs.to_json());

        on_progress(VoteProgress::GeneratingProof);
        let proof = self
            .prover
            .generate(&inputs)
            .map_err(|err| VoteFailure {
                stage: VoteProgress::GeneratingProof,
                source: VoteError::ProofGeneration(err.0),
            })?;

        on_progress(VoteProgress::Submitting);
        let tx = self
            .submit(proposal, &inputs, &proof)
            .await
            .map_err(|source| VoteFailure {
                stage: VoteProgress::Submitting,
                source,
            })?;

        // Local bookkeeping only; the contract is what rejects double votes.
        let option_index = selected.first().map(|&i| i as i64).unwrap_or(-1);
        self.store
            .record_vote(
                &inputs.nullifier,
                &proposal.voting_contract_address,
                &tx,
                proposal.id,
                option_index,
            )
            .map_err(|err| VoteFailure {
                stage: VoteProgress::Submitting,
                source: VoteError::Store(err),
            })?;

        info!("vote submitted for proposal {}: {tx}", proposal.id);
        on_progress(VoteProgress::Confirmed);
        Ok(VoteReceipt {
            tx,
            nullifier: inputs.nullifier,
        })
    }

    async fn build_inputs(
        &self,
        proposal: &ProposalInfo,
        selected: &[usize],
    ) -> Result<CircuitInputs, VoteError> {
        let identity = self
            .store
            .identity()
            .ok_or(VoteError::IdentityMissing)?
            .clone();

        let voting = VotingContract::new(self.client, proposal.voting_contract_address.clone());
        let registration =
            RegistrationContract::new(self.client, self.config.chain.registration_contract.clone());

        let event_id = voting.proposal_event_id(proposal.id).await?;
        let root = registration.get_root().await?;

        // No parsed option list means the contract defines the range.
        let option_count = if proposal.options.is_empty() {
            256
        } else {
            proposal.options.len()
        };
        let votes = calldata::encode_vote_bitmasks(selected, option_count);
        if votes.is_empty() {
            return Err(VoteError::Codec("no valid option selected"));
        }

        Ok(CircuitInputs {
            registration_root: format!("0x{}", hex::encode(root)),
            current_date: calldata::packed_date(&Date::today()),
            proposal_event_id: format!("0x{}", hex::encode(event_id)),
            nullifier: identity.nullifier,
            citizenship: citizenship_code(&identity.citizenship),
            identity_creation_timestamp: identity.created_at,
            votes: votes
                .iter()
                .map(|w| format!("0x{}", hex::encode(w)))
                .collect(),
        })
    }

    async fn submit(
        &self,
        proposal: &ProposalInfo,
        inputs: &CircuitInputs,
        proof: &ZkProof,
    ) -> Result<String, VoteError> {
        let votes: Vec<[u8; abi::WORD]> = inputs
            .votes
            .iter()
            .map(|v| abi::parse_u256(v))
            .collect::<Option<_>>()
            .ok_or(VoteError::Codec("vote bitmask is not a valid word"))?;
        let nullifier = abi::parse_u256(&inputs.nullifier)
            .ok_or(VoteError::Codec("nullifier is not a valid word"))?;
        let root = abi::parse_u256(&inputs.registration_root)
            .ok_or(VoteError::Codec("registration root is not a valid word"))?;

        let payload = calldata::encode_user_payload(
            proposal.id,
            &votes,
            nullifier,
            inputs.citizenship,
            inputs.identity_creation_timestamp,
        );
        let tx_data = calldata::encode_execute_calldata(
            root,
            abi::word_from_u64(inputs.current_date),
            &payload,
            proof,
        )
        .map_err(VoteError::Codec)?;

        match &self.config.relayer {
            Some(relayer) => Ok(RelayerClient::new(relayer)
                .submit_vote(&tx_data, &proposal.voting_contract_address)
                .await?),
            None => {
                self.send_direct(&proposal.voting_contract_address, &tx_data)
                    .await
            }
        }
    }

    /// Development-only: sign with the configured test key and push the raw
    /// transaction straight to the local chain.
    async fn send_direct(&self, to: &str, tx_data: &str) -> Result<String, VoteError> {
        let chain = &self.config.chain;
        let key = chain
            .dev_key
            .as_deref()
            .ok_or(VoteError::Config("no relayer and no dev signing key"))?;
        let signer = DevSigner::from_hex(key, chain.chain_id)?;

        let nonce = self.client.transaction_count(&signer.address()).await?;
        let gas_price = match chain.gas_price {
            Some(price) => price,
            None => self.client.gas_price().await?,
        };
        let to_addr = abi::parse_address(to)
            .ok_or(VoteError::Codec("destination is not a 20-byte address"))?;
        let data = abi::decode_hex(tx_data).ok_or(VoteError::Codec("calldata is not valid hex"))?;

        let raw = signer.sign_legacy_tx(nonce, gas_price as u128, chain.gas_limit, &to_addr, 0, &data)?;
        Ok(self.client.send_raw_transaction(&raw).await?)
    }
}

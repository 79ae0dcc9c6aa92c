//! Typed access to the Distributor, Wrapper and ERC-20 contracts. Every RPC
//! or decoding failure surfaces to the caller; historical `balanceOf` reads
//! assume an archive-class RPC endpoint.

use ethabi::RawLog;
use failure::Error;
use futures::stream::{self, StreamExt, TryStreamExt};
use web3::contract::{Contract, Options};
use web3::signing::SecretKey;
use web3::transports::Http;
use web3::types::{
    Address, BlockId, BlockNumber, FilterBuilder, TransactionReceipt, H256, U256,
};

use crate::distribution::Claim;
use crate::error::DistributorError;

const DISTRIBUTOR_ABI: &str = include_str!("../data/Distributor.abi");
const WRAPPER_ABI: &str = include_str!("../data/Wrapper.abi");
const ERC20_ABI: &str = include_str!("../data/ERC20.abi");

/// In-flight cap for fanned-out per-recipient queries, so a large recipient
/// set does not overwhelm the RPC endpoint.
pub const CONCURRENT_RPC_REQUESTS: usize = 8;

fn at_block(block: u64) -> Option<BlockId> {
    Some(BlockId::Number(BlockNumber::Number(block.into())))
}

#[derive(Clone)]
pub struct Chain {
    web3: web3::Web3<Http>,
}

impl Chain {
    pub fn connect(rpc_url: &str) -> Result<Self, Error> {
        let transport = Http::new(rpc_url)?;
        Ok(Self {
            web3: web3::Web3::new(transport),
        })
    }

    pub fn web3(&self) -> &web3::Web3<Http> {
        &self.web3
    }

    pub async fn current_block(&self) -> Result<u64, Error> {
        Ok(self.web3.eth().block_number().await?.as_u64())
    }

    pub fn distributor(&self, address: Address) -> Result<Distributor, Error> {
        let contract = Contract::from_json(self.web3.eth(), address, DISTRIBUTOR_ABI.as_bytes())?;
        Ok(Distributor {
            web3: self.web3.clone(),
            contract,
        })
    }

    pub fn wrapper(&self, address: Address) -> Result<Wrapper, Error> {
        let contract = Contract::from_json(self.web3.eth(), address, WRAPPER_ABI.as_bytes())?;
        Ok(Wrapper {
            web3: self.web3.clone(),
            contract,
        })
    }

    pub fn erc20(&self, address: Address) -> Result<Erc20, Error> {
        let contract = Contract::from_json(self.web3.eth(), address, ERC20_ABI.as_bytes())?;
        Ok(Erc20 { contract })
    }
}

#[derive(Clone)]
pub struct Distributor {
    web3: web3::Web3<Http>,
    contract: Contract<Http>,
}

impl Distributor {
    pub fn address(&self) -> Address {
        self.contract.address()
    }

    pub async fn root(&self) -> Result<H256, Error> {
        let root: H256 = self
            .contract
            .query("root", (), None, Options::default(), None)
            .await?;
        Ok(root)
    }

    pub async fn cid(&self) -> Result<String, Error> {
        let cid: String = self
            .contract
            .query("cid", (), None, Options::default(), None)
            .await?;
        Ok(cid)
    }

    pub async fn last_processed_block(&self) -> Result<u64, Error> {
        let block: U256 = self
            .contract
            .query("lastProcessedBlock", (), None, Options::default(), None)
            .await?;
        Ok(block.as_u64())
    }

    pub async fn tokens(&self) -> Result<Vec<Address>, Error> {
        let tokens: Vec<Address> = self
            .contract
            .query("getTokens", (), None, Options::default(), None)
            .await?;
        Ok(tokens)
    }

    /// Sum of `Claimed` amounts for `token` over `[from_block, to_block]`.
    pub async fn claimed_since(
        &self,
        token: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<U256, Error> {
        let abi = ethabi::Contract::load(DISTRIBUTOR_ABI.as_bytes())?;
        let event = abi.event("Claimed")?;

        let filter = FilterBuilder::default()
            .address(vec![self.address()])
            .topics(
                Some(vec![event.signature()]),
                None,
                Some(vec![H256::from(token)]),
                None,
            )
            .from_block(BlockNumber::Number(from_block.into()))
            .to_block(BlockNumber::Number(to_block.into()))
            .build();
        let logs = self.web3.eth().logs(filter).await?;
        debug!(
            "{} Claimed logs for token {:?} in blocks {}..={}",
            logs.len(),
            token,
            from_block,
            to_block
        );

        let mut total = U256::zero();
        for log in logs {
            let parsed = event.parse_log(RawLog {
                topics: log.topics.clone(),
                data: log.data.0.clone(),
            })?;
            let amount = parsed
                .params
                .iter()
                .find(|param| param.name == "amount")
                .and_then(|param| param.value.clone().into_uint())
                .ok_or_else(|| format_err!("malformed Claimed event log"))?;
            total = total
                .checked_add(amount)
                .ok_or_else(|| format_err!("claimed amounts overflow uint256"))?;
        }
        Ok(total)
    }

    pub async fn set_merkle_root(
        &self,
        root: H256,
        cid: &str,
        key: &SecretKey,
    ) -> Result<TransactionReceipt, Error> {
        let receipt = self
            .contract
            .signed_call_with_confirmations(
                "setMerkleRoot",
                (root, cid.to_owned()),
                Options::with(|options| options.gas = Some(500_000.into())),
                1,
                key,
            )
            .await?;
        check_receipt("setMerkleRoot", receipt)
    }

    pub async fn claim(
        &self,
        claim: &Claim,
        proof: Vec<H256>,
        key: &SecretKey,
    ) -> Result<TransactionReceipt, Error> {
        let receipt = self
            .contract
            .signed_call_with_confirmations(
                "claim",
                (claim.recipient, claim.token, claim.amount, proof),
                Options::with(|options| options.gas = Some(500_000.into())),
                1,
                key,
            )
            .await?;
        check_receipt("claim", receipt)
    }
}

fn check_receipt(func: &str, receipt: TransactionReceipt) -> Result<TransactionReceipt, Error> {
    if receipt.status == Some(0.into()) {
        return Err(DistributorError::TxReverted(format!(
            "{} (tx {:?})",
            func, receipt.transaction_hash
        ))
        .into());
    }
    info!("{} confirmed in tx {:?}", func, receipt.transaction_hash);
    Ok(receipt)
}

#[derive(Clone)]
pub struct Wrapper {
    web3: web3::Web3<Http>,
    contract: Contract<Http>,
}

impl Wrapper {
    pub async fn total_supply(&self, block: u64) -> Result<U256, Error> {
        let supply: U256 = self
            .contract
            .query("totalSupply", (), None, Options::default(), at_block(block))
            .await?;
        Ok(supply)
    }

    pub async fn balance_of(&self, owner: Address, block: u64) -> Result<U256, Error> {
        let balance: U256 = self
            .contract
            .query(
                "balanceOf",
                (owner,),
                None,
                Options::default(),
                at_block(block),
            )
            .await?;
        Ok(balance)
    }

    /// `owner` of every `Deposit` event over `[from_block, to_block]`.
    pub async fn deposit_owners(&self, from_block: u64, to_block: u64) -> Result<Vec<Address>, Error> {
        let abi = ethabi::Contract::load(WRAPPER_ABI.as_bytes())?;
        let event = abi.event("Deposit")?;

        let filter = FilterBuilder::default()
            .address(vec![self.contract.address()])
            .topics(Some(vec![event.signature()]), None, None, None)
            .from_block(BlockNumber::Number(from_block.into()))
            .to_block(BlockNumber::Number(to_block.into()))
            .build();
        let logs = self.web3.eth().logs(filter).await?;

        let mut owners = Vec::with_capacity(logs.len());
        for log in logs {
            let parsed = event.parse_log(RawLog {
                topics: log.topics.clone(),
                data: log.data.0.clone(),
            })?;
            let owner = parsed
                .params
                .iter()
                .find(|param| param.name == "owner")
                .and_then(|param| param.value.clone().into_address())
                .ok_or_else(|| format_err!("malformed Deposit event log"))?;
            owners.push(owner);
        }
        Ok(owners)
    }

    /// Balances of all `recipients` at `block`, fanned out with a bounded
    /// number of in-flight requests.
    pub async fn balances_at(
        &self,
        recipients: &[Address],
        block: u64,
    ) -> Result<Vec<(Address, U256)>, Error> {
        let queries = recipients.iter().map(|recipient| {
            let wrapper = self.clone();
            let recipient = *recipient;
            async move {
                let balance = wrapper.balance_of(recipient, block).await?;
                Ok::<_, Error>((recipient, balance))
            }
        });
        stream::iter(queries)
            .buffered(CONCURRENT_RPC_REQUESTS)
            .try_collect()
            .await
    }
}

#[derive(Clone)]
pub struct Erc20 {
    contract: Contract<Http>,
}

impl Erc20 {
    /// `balanceOf(holder)`, optionally pinned to a historical block.
    pub async fn balance_of(&self, holder: Address, block: Option<u64>) -> Result<U256, Error> {
        let balance: U256 = self
            .contract
            .query(
                "balanceOf",
                (holder,),
                None,
                Options::default(),
                block.and_then(at_block),
            )
            .await?;
        Ok(balance)
    }
}

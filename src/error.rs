/// Conditions the engine detects itself; transport failures (RPC, HTTP,
/// JSON) propagate as plain `failure::Error` values. Nothing is retried.
#[derive(Debug, Fail)]
pub enum DistributorError {
    #[fail(display = "missing configuration value: {}", _0)]
    ConfigMissing(String),
    #[fail(display = "signer required: {}", _0)]
    SignerRequired(String),
    #[fail(display = "validation failure: {}", _0)]
    ValidationFailure(String),
    #[fail(display = "proof not found: {}", _0)]
    ProofNotFound(String),
    #[fail(display = "blob store failure: {}", _0)]
    BlobStore(String),
    #[fail(display = "transaction reverted: {}", _0)]
    TxReverted(String),
    #[fail(display = "no claims to process")]
    NoClaims,
}

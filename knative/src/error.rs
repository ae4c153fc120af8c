use thiserror::Error;
use kube::error::Error as KubeError;
use crate::addressable_type::AddressableErr;

#[derive(Error, Debug)]
pub enum Error {
    /// Discovery errors
    #[error("Error from discovery: {0}")]
    Discovery(#[source] DiscoveryError),
    /// The referenced object could not provide an address
    #[error("Error resolving address: {0}")]
    Addressable(#[from] AddressableErr),
    /// Kube errors
    #[error("Error: {0}")]
    KubeError(#[from] KubeError),
}

impl From<DiscoveryError> for Error {
    fn from(err: DiscoveryError) -> Self {
        Error::Discovery(err)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("destination missing Ref and URI, expected at least one")]
    EmptyDestination,
    #[error("reference to {0} is missing apiVersion")]
    MissingApiVersion(String),
    #[error("unable to parse apiVersion {0:?}")]
    InvalidApiVersion(String),
}

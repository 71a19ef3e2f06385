pub mod abi;
pub mod address;
pub mod contract;

// Re-export commonly used types
pub use abi::{Abi, AbiItem, Param, StateMutability};
pub use address::{Address, AddressSpec, RawAddress};
pub use contract::{Contract, ContractDefinition, ContractMeta};

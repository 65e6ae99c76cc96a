//! NextGCore NEF (Network Exposure Function) Library
//!
//! This crate implements the NEF network function for 5G core network.
//! The NEF exposes traffic influence and PFD management to external AFs
//! and brokers those requests to the PCF and UDR.

pub mod config;
pub mod consumer;
pub mod context;
pub mod error;
pub mod models;
pub mod notifier;
pub mod processor;
pub mod sbi_path;


// Re-export commonly used types
pub use config::{ConfigError, NefConfig, NEF_DEFAULT_CONFIG_PATH};
pub use consumer::{Consumer, NrfService, PcfService, PeerError, PeerResult, UdrService};
pub use context::{AfContext, AfPfdTransaction, AfSubscription, ContextError, NefContext};
pub use error::{NefError, NefResult};
pub use notifier::{
    HttpPfdNotificationSender, NotifyDispatcher, PfdChangeNotifier, PfdNotificationSender,
};
pub use processor::{HandlerResponse, Processor};
pub use sbi_path::nef_sbi_request_handler;

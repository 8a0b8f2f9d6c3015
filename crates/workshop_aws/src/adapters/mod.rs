pub mod aws;
pub mod fetch;
pub mod http;
pub mod object_store;
pub mod provisioning;

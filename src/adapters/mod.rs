pub mod mock;
pub mod opcua_client;

pub mod cooldown;
pub mod http_client_factory;

pub mod action_dispatcher;
pub mod notification_fetcher;
pub mod token_provider;
pub mod transport;

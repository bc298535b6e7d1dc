mod auth;
mod storage;

pub use auth::APP_EXPIRY_KEY;
pub use auth::APP_TOKEN_KEY;
pub use auth::AuthorizationPrompt;
pub use auth::EXPIRY_MARGIN_MS;
pub use auth::TokenManager;
pub use auth::TokenState;
pub use auth::USER_EXPIRY_KEY;
pub use auth::USER_REFRESH_KEY;
pub use auth::USER_TOKEN_KEY;
pub use storage::FileStore;
pub use storage::KeyValueStore;
pub use storage::MemoryStore;

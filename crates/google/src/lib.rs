//! Google Drive and Sheets clients backing the claim pipeline's storage and
//! spreadsheet collaborators.

pub mod credentials;
pub mod drive;
pub mod sheets;

pub use credentials::{
    CredentialError, OAuthClientSettings, RefreshTokenCredentials, StaticToken, TokenProvider,
};
pub use drive::DriveClient;
pub use sheets::SheetsClient;

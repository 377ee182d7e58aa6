use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::CommandError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletInfo {
    pub account: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionWallet {
    pub account: String,
    pub private_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectMessage {
    pub id: String,
    pub from: String,
    pub to: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MixerNote {
    pub secret: String,
    pub commitment: String,
    pub amount: f64,
    pub spent: bool,
}

/// Remote collaborators reached by command handlers: wallet providers, the
/// message relay and the mixer contract.
#[async_trait]
pub trait Services: Send + Sync {
    async fn connect_browser_wallet(&self) -> Result<WalletInfo, CommandError>;

    async fn create_session_wallet(&self) -> Result<SessionWallet, CommandError>;

    /// `private_key` is already validated and normalised to 64 hex digits.
    async fn import_private_key(&self, private_key: &str) -> Result<WalletInfo, CommandError>;

    /// Returns the relay's message id.
    async fn send_direct_message(
        &self,
        from: &str,
        to: &str,
        body: &str,
    ) -> Result<String, CommandError>;

    async fn mixer_deposit(&self, private_key: &str, amount: f64) -> Result<MixerNote, CommandError>;

    /// Returns the withdrawal transaction id.
    async fn mixer_withdraw(
        &self,
        private_key: &str,
        secret: &str,
        recipient: &str,
    ) -> Result<String, CommandError>;

    /// Messages sent during this session, oldest first.
    fn sent_messages(&self) -> Vec<DirectMessage>;

    /// Notes deposited during this session.
    fn mixer_notes(&self) -> Vec<MixerNote>;
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Account id used by the offline backend: a digest of the key. It is not a
/// chain address.
pub fn offline_account_for_key(private_key: &str) -> String {
    let digest = sha256_hex(private_key.as_bytes());
    format!("0x{}", &digest[..40])
}

fn random_hex() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

/// In-memory backend with no network access.
#[derive(Default)]
pub struct OfflineServices {
    outbox: Mutex<Vec<DirectMessage>>,
    notes: Mutex<Vec<MixerNote>>,
}

impl OfflineServices {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Services for OfflineServices {
    async fn connect_browser_wallet(&self) -> Result<WalletInfo, CommandError> {
        Err(CommandError::not_initialized(
            "No browser wallet available in offline mode",
        ))
    }

    async fn create_session_wallet(&self) -> Result<SessionWallet, CommandError> {
        let private_key = sha256_hex(random_hex().as_bytes());
        let account = offline_account_for_key(&private_key);
        info!("Created offline session wallet {}", account);
        Ok(SessionWallet {
            account,
            private_key,
        })
    }

    async fn import_private_key(&self, private_key: &str) -> Result<WalletInfo, CommandError> {
        Ok(WalletInfo {
            account: offline_account_for_key(private_key),
        })
    }

    async fn send_direct_message(
        &self,
        from: &str,
        to: &str,
        body: &str,
    ) -> Result<String, CommandError> {
        let message = DirectMessage {
            id: uuid::Uuid::new_v4().to_string(),
            from: from.to_string(),
            to: to.to_string(),
            body: body.to_string(),
            sent_at: Utc::now(),
        };
        let id = message.id.clone();
        self.outbox
            .lock()
            .map_err(|_| CommandError::Other(anyhow::anyhow!("outbox lock poisoned")))?
            .push(message);
        Ok(id)
    }

    async fn mixer_deposit(&self, _private_key: &str, amount: f64) -> Result<MixerNote, CommandError> {
        let secret = random_hex();
        let note = MixerNote {
            commitment: format!("0x{}", sha256_hex(secret.as_bytes())),
            secret,
            amount,
            spent: false,
        };
        self.notes
            .lock()
            .map_err(|_| CommandError::Other(anyhow::anyhow!("note store lock poisoned")))?
            .push(note.clone());
        Ok(note)
    }

    async fn mixer_withdraw(
        &self,
        _private_key: &str,
        secret: &str,
        recipient: &str,
    ) -> Result<String, CommandError> {
        let commitment = format!("0x{}", sha256_hex(secret.as_bytes()));
        let mut notes = self
            .notes
            .lock()
            .map_err(|_| CommandError::Other(anyhow::anyhow!("note store lock poisoned")))?;

        let note = notes
            .iter_mut()
            .find(|n| n.commitment == commitment)
            .ok_or_else(|| CommandError::validation("No deposit matches that secret"))?;
        if note.spent {
            return Err(CommandError::validation("That note has already been withdrawn"));
        }
        note.spent = true;

        Ok(format!(
            "0x{}",
            sha256_hex(format!("{}:{}", commitment, recipient).as_bytes())
        ))
    }

    fn sent_messages(&self) -> Vec<DirectMessage> {
        self.outbox
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    fn mixer_notes(&self) -> Vec<MixerNote> {
        self.notes
            .lock()
            .map(|notes| notes.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_browser_wallet_unavailable_offline() {
        let services = OfflineServices::new();
        let err = services.connect_browser_wallet().await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotInitialized);
    }

    #[tokio::test]
    async fn test_session_wallet_shape() {
        let services = OfflineServices::new();
        let wallet = services.create_session_wallet().await.unwrap();
        assert_eq!(wallet.private_key.len(), 64);
        assert_eq!(wallet.account.len(), 42);
        assert_eq!(wallet.account, offline_account_for_key(&wallet.private_key));
    }

    #[tokio::test]
    async fn test_mixer_note_spends_once() {
        let services = OfflineServices::new();
        let note = services.mixer_deposit("key", 1.5).await.unwrap();
        assert_eq!(services.mixer_notes().len(), 1);

        let tx = services
            .mixer_withdraw("key", &note.secret, "0xdest")
            .await
            .unwrap();
        assert!(tx.starts_with("0x"));
        assert!(services.mixer_notes()[0].spent);

        let again = services.mixer_withdraw("key", &note.secret, "0xdest").await;
        assert!(again.is_err());
        assert!(services.mixer_withdraw("key", "bogus", "0xdest").await.is_err());
    }
}

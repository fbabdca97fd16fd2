//! Telegram Bot API as a message source

use super::{MessageSource, RawUpdate};
use crate::error::Result;
use crate::telegram::TelegramClient;
use async_trait::async_trait;

#[async_trait]
impl MessageSource for TelegramClient {
    async fn fetch(&self, offset: i64) -> Result<Vec<RawUpdate>> {
        let updates = self.get_updates(offset).await?;
        Ok(updates
            .into_iter()
            .map(|u| RawUpdate {
                update_id: u.update_id,
                message: u.into_incoming(),
            })
            .collect())
    }

    async fn latest_update_id(&self) -> Result<Option<i64>> {
        TelegramClient::latest_update_id(self).await
    }
}

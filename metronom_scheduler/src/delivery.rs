use async_trait::async_trait;

use metronom_models::user::UserId;

/// Outbound side of the scheduler: how a fired reminder reaches its user.
#[async_trait]
pub trait DeliveryChannel: Send + Sync + 'static {
    async fn send_message(&self, user: UserId, text: &str) -> anyhow::Result<()>;
}

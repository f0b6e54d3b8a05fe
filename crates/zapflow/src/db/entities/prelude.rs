pub use super::bot::Entity as Bot;
pub use super::flow::Entity as Flow;
pub use super::flow_log::Entity as FlowLog;
pub use super::flow_state::Entity as FlowState;
pub use super::message::Entity as Message;
pub use super::webhook::Entity as Webhook;
pub use super::webhook_config::Entity as WebhookConfig;
pub use super::whatsapp_token::Entity as WhatsappToken;

pub mod agent;
pub mod composio;
pub mod health;

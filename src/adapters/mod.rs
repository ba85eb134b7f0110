pub mod feishu;
pub mod gateway_client;
pub mod system;
pub mod telegram;
pub mod webdriver;

pub use feishu::FeishuNotifier;
pub use gateway_client::GatewayClient;
pub use system::LocalGateway;
pub use telegram::TelegramNotifier;
pub use webdriver::WebDriverBrowser;

pub mod server;

use crate::api::AppConfig;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        config: AppConfig,
    },
}

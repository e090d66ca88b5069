pub mod server;

use crate::auth::AuthConfig;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        redis_url: String,
        mail_url: Option<String>,
        auth: AuthConfig,
    },
}

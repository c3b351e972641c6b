use crate::env_or;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_or("PORT", 3000),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_ORDER_ENTRY_PORT: u16 = 7083;
pub const DEFAULT_HTTP_PORT: u16 = 8083;
pub const DEFAULT_METRICS_PORT: u16 = 9090;
pub const DEFAULT_REQUEST_QUEUE_CAPACITY: usize = 4096;
pub const DEFAULT_DEPTH: usize = 10;

pub fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

pub fn default_order_entry_port() -> u16 {
    DEFAULT_ORDER_ENTRY_PORT
}

pub fn default_http_port() -> Option<u16> {
    Some(DEFAULT_HTTP_PORT)
}

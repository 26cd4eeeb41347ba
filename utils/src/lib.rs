pub mod endpoint_url;
pub mod surf_logging;

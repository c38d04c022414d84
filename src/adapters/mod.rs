pub mod http_source;
pub mod influx;
pub mod line_protocol;
pub mod mqtt;

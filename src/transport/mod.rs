//! 传输模块：基于 reqwest 的 JSON HTTP 客户端，统一映射外部服务错误。

pub mod http;

pub use http::{retry_after_secs, HttpTransport, HttpTransportConfig};

pub mod jaeger;
pub mod zipkin;

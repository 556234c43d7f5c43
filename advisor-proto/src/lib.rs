//! Generated protobuf and gRPC types for package `advisor.v1`.

include!(concat!(env!("OUT_DIR"), "/advisor.v1.rs"));

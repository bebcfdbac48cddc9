pub mod local_node;

/// Address of the development node the tests run against.
pub const NODE_HOST: &str = "http://127.0.0.1:8545";

pub mod data_node;
pub mod edit;

pub use data_node::{
    DataNode, DataNodeId, Properties, DEFAULT_PATH_KEY, IS_GENERATED_KEY, PATH_KEY,
};
pub use edit::{Edit, EditLock, SYSTEM_EDITOR};

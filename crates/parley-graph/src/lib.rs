pub mod builder;
pub mod graph;
pub mod node;
pub mod nodes;
pub mod router;

pub use builder::GraphBuilder;
pub use graph::Graph;
pub use node::{EventSender, Node, NodeType};
pub use nodes::{LLMNode, ToolNode};
pub use router::{NextNode, Router, SimpleRouter};

// Re-export key types from parley-types
pub use parley_types::{
    ContextPolicy, EndStatus, GraphConfig, GraphInput, GraphOutput, GraphState, LLMConfig,
    StreamEvent,
};

pub mod consts;
pub mod evaluator;
pub mod functions;
pub mod matcher;
pub mod model;
pub mod occurrence;
pub mod parser;
pub mod query;
pub mod resolver;
pub mod runtime;
pub mod simple_node;
pub mod types;
pub mod xdm;

pub use evaluator::SequenceTypeEvaluator;
pub use functions::default_function_registry;
pub use matcher::ItemTypeMatcher;
pub use model::{NodeFactory, NodeKind, QName, XdmNode};
pub use occurrence::{CountState, OccurrenceCounter};
pub use parser::XQueryParser;
pub use query::{CompiledQuery, compile_query, evaluate_query};
pub use resolver::{StaticError, TypeNameResolver, resolve_sequence_type};
pub use runtime::{
    ConsumptionPolicy, DynamicContext, DynamicContextBuilder, Error, ErrorCode, FunctionRegistry, StaticContext,
    StaticContextBuilder,
};
pub use simple_node::{SimpleNode, SimpleNodeBuilder, attr, comment, doc, elem, pi, text};
pub use types::{
    AtomicTypeId, FunctionSignature, FunctionTest, ItemType, MatchOutcome, NameTest, NodeKindTest, NodeTest,
    Occurrence, SequenceType, TypeHierarchy,
};
pub use xdm::{AtomicValue, ExpandedName, FunctionItem, XdmAtomicValue, XdmItem, XdmSequence, XdmStream};

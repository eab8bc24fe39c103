//! Built-in functions available to queries.

use crate::consts::{FNS, XS};
use crate::model::XdmNode;
use crate::runtime::FunctionRegistry;
use crate::types::{AtomicTypeId, FunctionSignature, ItemType, Occurrence, SequenceType};

mod boolean;
mod common;
mod constructors;
mod error;
mod numeric;
mod sequence;

fn atomic(t: AtomicTypeId, o: Occurrence) -> SequenceType {
    SequenceType::atomic(t, o)
}

fn boolean_result(params: impl IntoIterator<Item = SequenceType>) -> FunctionSignature {
    FunctionSignature::new(params, atomic(AtomicTypeId::Boolean, Occurrence::ExactlyOne))
}

/// Registry with `fn:error`, the boolean and cardinality functions, `fn:abs` and one
/// constructor function per instantiable built-in atomic type.
pub fn default_function_registry<N: XdmNode>() -> FunctionRegistry<N> {
    let mut reg: FunctionRegistry<N> = FunctionRegistry::new();
    let qname = atomic(AtomicTypeId::QName, Occurrence::ZeroOrOne);
    let string = atomic(AtomicTypeId::String, Occurrence::ExactlyOne);

    // ===== errors =====
    for params in [vec![], vec![qname.clone()], vec![qname, string]] {
        reg.register_ns(FNS, "error", FunctionSignature::new(params, SequenceType::any()), error::error_fn::<N>);
    }

    // ===== booleans =====
    reg.register_ns(FNS, "true", boolean_result([]), boolean::fn_true::<N>);
    reg.register_ns(FNS, "false", boolean_result([]), boolean::fn_false::<N>);
    reg.register_ns(FNS, "not", boolean_result([SequenceType::any()]), boolean::fn_not::<N>);

    // ===== cardinality =====
    reg.register_ns(FNS, "exists", boolean_result([SequenceType::any()]), sequence::exists_fn::<N>);
    reg.register_ns(FNS, "empty", boolean_result([SequenceType::any()]), sequence::empty_fn::<N>);
    reg.register_ns(
        FNS,
        "count",
        FunctionSignature::new([SequenceType::any()], atomic(AtomicTypeId::Integer, Occurrence::ExactlyOne)),
        sequence::count_fn::<N>,
    );

    // ===== numeric =====
    let any_atomic = atomic(AtomicTypeId::AnyAtomicType, Occurrence::ZeroOrOne);
    reg.register_ns(
        FNS,
        "abs",
        FunctionSignature::new([any_atomic.clone()], any_atomic.clone()),
        numeric::abs_fn::<N>,
    );

    // ===== constructors =====
    for &id in AtomicTypeId::ALL.iter().filter(|id| !id.is_abstract()) {
        let signature = FunctionSignature::new(
            [any_atomic.clone()],
            SequenceType::new(ItemType::Atomic(id), Occurrence::ZeroOrOne),
        );
        reg.register_ns(XS, id.local_name(), signature, constructors::constructor::<N>(id));
    }

    tracing::trace!("default function registry built");
    reg
}

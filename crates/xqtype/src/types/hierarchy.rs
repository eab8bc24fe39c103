//! Built-in atomic type derivation hierarchy.
//!
//! The hierarchy is a single-rooted tree below `xs:anyAtomicType`. It is stored as a flat
//! table indexed by [`AtomicTypeId`]: every id gets its ancestor chain (nearest parent first)
//! and an ancestor bitset, both computed once. `is_subtype_of` is a single bit test.
//!
//! List types (`xs:NMTOKENS`, `xs:IDREFS`, `xs:ENTITIES`) are known by name only
//! ([`ListTypeId`]) and are never part of the tree.

use smallvec::SmallVec;
use std::fmt;
use std::sync::LazyLock;

macro_rules! atomic_types {
    ($($variant:ident => $local:literal,)*) => {
        /// Identity of a built-in atomic type.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum AtomicTypeId {
            $($variant,)*
        }

        impl AtomicTypeId {
            /// All built-in atomic types in declaration order (the root first).
            pub const ALL: &'static [AtomicTypeId] = &[$(AtomicTypeId::$variant,)*];

            /// Local name in the XML Schema namespace.
            pub const fn local_name(self) -> &'static str {
                match self {
                    $(AtomicTypeId::$variant => $local,)*
                }
            }

            pub fn from_local_name(local: &str) -> Option<Self> {
                match local {
                    $($local => Some(AtomicTypeId::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

atomic_types! {
    AnyAtomicType => "anyAtomicType",
    UntypedAtomic => "untypedAtomic",
    String => "string",
    NormalizedString => "normalizedString",
    Token => "token",
    Language => "language",
    NmToken => "NMTOKEN",
    Name => "Name",
    NcName => "NCName",
    Id => "ID",
    IdRef => "IDREF",
    Entity => "ENTITY",
    Boolean => "boolean",
    Decimal => "decimal",
    Integer => "integer",
    NonPositiveInteger => "nonPositiveInteger",
    NegativeInteger => "negativeInteger",
    Long => "long",
    Int => "int",
    Short => "short",
    Byte => "byte",
    NonNegativeInteger => "nonNegativeInteger",
    UnsignedLong => "unsignedLong",
    UnsignedInt => "unsignedInt",
    UnsignedShort => "unsignedShort",
    UnsignedByte => "unsignedByte",
    PositiveInteger => "positiveInteger",
    Float => "float",
    Double => "double",
    Duration => "duration",
    YearMonthDuration => "yearMonthDuration",
    DayTimeDuration => "dayTimeDuration",
    DateTime => "dateTime",
    Date => "date",
    Time => "time",
    GYearMonth => "gYearMonth",
    GYear => "gYear",
    GMonthDay => "gMonthDay",
    GDay => "gDay",
    GMonth => "gMonth",
    Base64Binary => "base64Binary",
    HexBinary => "hexBinary",
    AnyUri => "anyURI",
    QName => "QName",
    Notation => "NOTATION",
}

// The ancestor bitset is a u64.
const _: () = assert!(AtomicTypeId::ALL.len() <= 64);

impl AtomicTypeId {
    /// Direct base type. `None` only for the root `xs:anyAtomicType`.
    pub const fn parent(self) -> Option<AtomicTypeId> {
        use AtomicTypeId::*;
        Some(match self {
            AnyAtomicType => return None,
            NormalizedString => String,
            Token => NormalizedString,
            Language | NmToken | Name => Token,
            NcName => Name,
            Id | IdRef | Entity => NcName,
            Integer => Decimal,
            NonPositiveInteger | Long | NonNegativeInteger => Integer,
            NegativeInteger => NonPositiveInteger,
            Int => Long,
            Short => Int,
            Byte => Short,
            UnsignedLong | PositiveInteger => NonNegativeInteger,
            UnsignedInt => UnsignedLong,
            UnsignedShort => UnsignedInt,
            UnsignedByte => UnsignedShort,
            YearMonthDuration | DayTimeDuration => Duration,
            UntypedAtomic | String | Boolean | Decimal | Float | Double | Duration | DateTime
            | Date | Time | GYearMonth | GYear | GMonthDay | GDay | GMonth | Base64Binary
            | HexBinary | AnyUri | QName | Notation => AnyAtomicType,
        })
    }

    /// Abstract types have no instances of their own and no constructor function.
    pub const fn is_abstract(self) -> bool {
        matches!(self, AtomicTypeId::AnyAtomicType | AtomicTypeId::Notation)
    }

    const fn index(self) -> usize {
        self as usize
    }

    const fn bit(self) -> u64 {
        1u64 << (self as u8)
    }
}

impl fmt::Display for AtomicTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xs:{}", self.local_name())
    }
}

/// Built-in list types. Recognized by name so they can be rejected with a precise error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListTypeId {
    NmTokens,
    IdRefs,
    Entities,
}

impl ListTypeId {
    pub const ALL: &'static [ListTypeId] =
        &[ListTypeId::NmTokens, ListTypeId::IdRefs, ListTypeId::Entities];

    pub const fn local_name(self) -> &'static str {
        match self {
            ListTypeId::NmTokens => "NMTOKENS",
            ListTypeId::IdRefs => "IDREFS",
            ListTypeId::Entities => "ENTITIES",
        }
    }

    /// Atomic type of the list members.
    pub const fn item_type(self) -> AtomicTypeId {
        match self {
            ListTypeId::NmTokens => AtomicTypeId::NmToken,
            ListTypeId::IdRefs => AtomicTypeId::IdRef,
            ListTypeId::Entities => AtomicTypeId::Entity,
        }
    }

    pub fn from_local_name(local: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|l| l.local_name() == local)
    }
}

type AncestorChain = SmallVec<[AtomicTypeId; 8]>;

/// Precomputed ancestor closure over all built-in atomic types.
#[derive(Debug)]
pub struct TypeHierarchy {
    // indexed by AtomicTypeId; nearest parent first, root last
    chains: Vec<AncestorChain>,
    // indexed by AtomicTypeId; bit set for self and every ancestor
    closure: Vec<u64>,
}

static HIERARCHY: LazyLock<TypeHierarchy> = LazyLock::new(TypeHierarchy::build);

impl TypeHierarchy {
    /// Process-wide hierarchy, built on first use and immutable afterwards.
    pub fn global() -> &'static TypeHierarchy {
        &HIERARCHY
    }

    fn build() -> Self {
        let count = AtomicTypeId::ALL.len();
        let mut chains = Vec::with_capacity(count);
        let mut closure = Vec::with_capacity(count);
        for &id in AtomicTypeId::ALL {
            debug_assert_eq!(id.index(), chains.len(), "ALL must follow discriminant order");
            let mut chain = AncestorChain::new();
            let mut bits = id.bit();
            let mut cur = id.parent();
            // A well-formed tree reaches the root in fewer than `count` steps.
            for _ in 0..count {
                let Some(p) = cur else { break };
                debug_assert!(bits & p.bit() == 0, "derivation cycle through {p}");
                chain.push(p);
                bits |= p.bit();
                cur = p.parent();
            }
            debug_assert!(cur.is_none(), "derivation chain of {id} does not terminate");
            debug_assert!(
                id == AtomicTypeId::AnyAtomicType
                    || chain.last() == Some(&AtomicTypeId::AnyAtomicType),
                "{id} is not rooted at xs:anyAtomicType"
            );
            chains.push(chain);
            closure.push(bits);
        }
        tracing::trace!(types = count, "atomic type hierarchy built");
        Self { chains, closure }
    }

    /// Look up a member of the tree by its local name in the XML Schema namespace.
    /// List types are not members.
    pub fn by_local_name(&self, local: &str) -> Option<AtomicTypeId> {
        AtomicTypeId::from_local_name(local)
    }

    /// `true` when `a` equals `b` or `b` is an ancestor of `a`.
    pub fn is_subtype_of(&self, a: AtomicTypeId, b: AtomicTypeId) -> bool {
        self.closure[a.index()] & b.bit() != 0
    }

    pub fn parent_of(&self, a: AtomicTypeId) -> Option<AtomicTypeId> {
        self.chains[a.index()].first().copied()
    }

    /// Ancestors of `a`, nearest first. Empty for the root.
    pub fn ancestors(&self, a: AtomicTypeId) -> &[AtomicTypeId] {
        &self.chains[a.index()]
    }

    /// Number of derivation steps between `a` and the root.
    pub fn depth(&self, a: AtomicTypeId) -> usize {
        self.chains[a.index()].len()
    }

    /// The primitive type `a` derives from (the ancestor directly below the root).
    pub fn primitive_of(&self, a: AtomicTypeId) -> AtomicTypeId {
        let chain = &self.chains[a.index()];
        match chain.len() {
            0 | 1 => a,
            n => chain[n - 2],
        }
    }

    /// Result type of a sign operation (`-x`, `fn:abs`) on a value of type `a`. Integer
    /// subtypes widen to `xs:integer`, everything else keeps its primitive type.
    pub fn numeric_result_of(&self, a: AtomicTypeId) -> AtomicTypeId {
        if self.is_subtype_of(a, AtomicTypeId::Integer) {
            AtomicTypeId::Integer
        } else {
            self.primitive_of(a)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AtomicTypeId::*;

    #[test]
    fn every_type_reaches_the_root() {
        let h = TypeHierarchy::global();
        for &id in AtomicTypeId::ALL {
            assert!(h.is_subtype_of(id, AnyAtomicType), "{id}");
            if id != AnyAtomicType {
                assert_eq!(h.ancestors(id).last(), Some(&AnyAtomicType));
            }
        }
        assert_eq!(h.parent_of(AnyAtomicType), None);
    }

    #[test]
    fn byte_chain_is_six_levels_deep() {
        let h = TypeHierarchy::global();
        assert_eq!(h.ancestors(Byte), &[Short, Int, Long, Integer, Decimal, AnyAtomicType]);
        assert_eq!(h.depth(Byte), 6);
        assert_eq!(h.primitive_of(Byte), Decimal);
        assert_eq!(h.primitive_of(Decimal), Decimal);
        assert_eq!(h.primitive_of(AnyAtomicType), AnyAtomicType);
    }

    #[test]
    fn string_family() {
        let h = TypeHierarchy::global();
        for id in [NormalizedString, Token, Language, NmToken, Name, NcName, Id, IdRef, Entity] {
            assert!(h.is_subtype_of(id, String), "{id}");
        }
        assert!(h.is_subtype_of(Id, NcName));
        assert!(!h.is_subtype_of(NmToken, Name));
        assert!(!h.is_subtype_of(AnyUri, String));
        assert!(!h.is_subtype_of(UntypedAtomic, String));
    }

    #[test]
    fn sign_operations_keep_the_numeric_family() {
        let h = TypeHierarchy::global();
        assert_eq!(h.numeric_result_of(Short), Integer);
        assert_eq!(h.numeric_result_of(Integer), Integer);
        assert_eq!(h.numeric_result_of(Decimal), Decimal);
        assert_eq!(h.numeric_result_of(Double), Double);
        assert_eq!(h.numeric_result_of(Float), Float);
    }

    #[test]
    fn names_round_trip() {
        for &id in AtomicTypeId::ALL {
            assert_eq!(AtomicTypeId::from_local_name(id.local_name()), Some(id));
        }
        assert_eq!(AtomicTypeId::from_local_name("qname"), None);
        assert_eq!(AtomicTypeId::from_local_name("NMTOKENS"), None);
        assert_eq!(ListTypeId::from_local_name("NMTOKENS"), Some(ListTypeId::NmTokens));
        assert_eq!(ListTypeId::IdRefs.item_type(), IdRef);
    }
}

//! # Semantic Type Tags
//!
//! Node, edge and link types are sent to the engine as integer codes built
//! from bit flags. Each enum here maps a closed set of variants to those
//! codes and to a stable kebab-case name used by the CLI and `Display`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// TYPE FLAGS
// =============================================================================

pub const NODE: u16 = 0x1;
pub const LINK: u16 = 0x2;
pub const EDGE_UCOMMON: u16 = 0x4;
pub const ARC_COMMON: u16 = 0x8;
pub const ARC_ACCESS: u16 = 0x10;
pub const CONST: u16 = 0x20;
pub const VAR: u16 = 0x40;
pub const ARC_POS: u16 = 0x80;
pub const ARC_NEG: u16 = 0x100;
pub const ARC_FUZ: u16 = 0x200;
pub const ARC_TEMP: u16 = 0x400;
pub const ARC_PERM: u16 = 0x800;

pub const NODE_TUPLE: u16 = 0x80;
pub const NODE_STRUCT: u16 = 0x100;
pub const NODE_ROLE: u16 = 0x200;
pub const NODE_NOROLE: u16 = 0x400;
pub const NODE_CLASS: u16 = 0x800;
pub const NODE_ABSTRACT: u16 = 0x1000;
pub const NODE_MATERIAL: u16 = 0x2000;

/// Mask covering both constancy flags.
pub const CONSTANCY_MASK: u16 = CONST | VAR;

/// Whether an element of type `actual` satisfies a template operand of
/// type `wanted`.
///
/// The element must carry every non-constancy flag of `wanted`, so an
/// unqualified `access` arc matches any access arc. A variable template
/// type matches constant elements; a type without constancy matches any
/// constancy.
#[must_use]
pub fn code_matches(wanted: u16, actual: u16) -> bool {
    if wanted == actual {
        return true;
    }
    let shape = wanted & !CONSTANCY_MASK;
    if actual & shape != shape {
        return false;
    }
    match wanted & CONSTANCY_MASK {
        0 => true,
        VAR => actual & CONSTANCY_MASK == CONST,
        _ => false,
    }
}

// =============================================================================
// TYPE ENUM MACRO
// =============================================================================

macro_rules! sc_type_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = ($code:expr, $label:literal), )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// All variants in declaration order.
            pub const ALL: &'static [$name] = &[$( $name::$variant, )+];

            /// Wire code understood by the engine.
            #[must_use]
            pub const fn code(self) -> u16 {
                match self {
                    $( $name::$variant => $code, )+
                }
            }

            /// Look up a variant by its wire code.
            #[must_use]
            pub fn from_code(code: u16) -> Option<Self> {
                match code {
                    $( c if c == $code => Some($name::$variant), )+
                    _ => None,
                }
            }

            /// Stable kebab-case name.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => $label, )+
                }
            }

            /// Whether a template operand of this type matches `actual`.
            #[must_use]
            pub fn matches(self, actual: u16) -> bool {
                code_matches(self.code(), actual)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|t| t.name() == s)
                    .ok_or_else(|| format!("unknown {} '{}'", stringify!($name), s))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_u16(self.code())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let code = u16::deserialize(deserializer)?;
                $name::from_code(code).ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        "unknown {} code {}",
                        stringify!($name),
                        code
                    ))
                })
            }
        }
    };
}

// =============================================================================
// NODE TYPES
// =============================================================================

sc_type_enum! {
    /// Semantic role of a node.
    pub enum NodeType {
        Node = (NODE, "node"),
        NodeConst = (NODE | CONST, "node-const"),
        NodeVar = (NODE | VAR, "node-var"),
        NodeStruct = (NODE | NODE_STRUCT, "node-struct"),
        NodeTuple = (NODE | NODE_TUPLE, "node-tuple"),
        NodeRole = (NODE | NODE_ROLE, "node-role"),
        NodeNoRole = (NODE | NODE_NOROLE, "node-norole"),
        NodeClass = (NODE | NODE_CLASS, "node-class"),
        NodeAbstract = (NODE | NODE_ABSTRACT, "node-abstract"),
        NodeMaterial = (NODE | NODE_MATERIAL, "node-material"),
        NodeConstStruct = (NODE | CONST | NODE_STRUCT, "node-const-struct"),
        NodeConstTuple = (NODE | CONST | NODE_TUPLE, "node-const-tuple"),
        NodeConstRole = (NODE | CONST | NODE_ROLE, "node-const-role"),
        /// Constant relation node.
        NodeConstNoRole = (NODE | CONST | NODE_NOROLE, "node-const-norole"),
        NodeConstClass = (NODE | CONST | NODE_CLASS, "node-const-class"),
        NodeConstAbstract = (NODE | CONST | NODE_ABSTRACT, "node-const-abstract"),
        NodeConstMaterial = (NODE | CONST | NODE_MATERIAL, "node-const-material"),
        NodeVarStruct = (NODE | VAR | NODE_STRUCT, "node-var-struct"),
        NodeVarTuple = (NODE | VAR | NODE_TUPLE, "node-var-tuple"),
        NodeVarRole = (NODE | VAR | NODE_ROLE, "node-var-role"),
        /// Variable relation node.
        NodeVarNoRole = (NODE | VAR | NODE_NOROLE, "node-var-norole"),
        NodeVarClass = (NODE | VAR | NODE_CLASS, "node-var-class"),
        NodeVarAbstract = (NODE | VAR | NODE_ABSTRACT, "node-var-abstract"),
        NodeVarMaterial = (NODE | VAR | NODE_MATERIAL, "node-var-material"),
    }
}

// =============================================================================
// EDGE TYPES
// =============================================================================

sc_type_enum! {
    /// Constancy, orientation and access kind of an edge.
    pub enum EdgeType {
        UCommon = (EDGE_UCOMMON, "ucommon"),
        DCommon = (ARC_COMMON, "dcommon"),
        UCommonConst = (EDGE_UCOMMON | CONST, "ucommon-const"),
        DCommonConst = (ARC_COMMON | CONST, "dcommon-const"),
        UCommonVar = (EDGE_UCOMMON | VAR, "ucommon-var"),
        DCommonVar = (ARC_COMMON | VAR, "dcommon-var"),
        Access = (ARC_ACCESS, "access"),
        AccessConstPosPerm = (ARC_ACCESS | CONST | ARC_POS | ARC_PERM, "access-const-pos-perm"),
        AccessConstNegPerm = (ARC_ACCESS | CONST | ARC_NEG | ARC_PERM, "access-const-neg-perm"),
        AccessConstFuzPerm = (ARC_ACCESS | CONST | ARC_FUZ | ARC_PERM, "access-const-fuz-perm"),
        AccessConstPosTemp = (ARC_ACCESS | CONST | ARC_POS | ARC_TEMP, "access-const-pos-temp"),
        AccessConstNegTemp = (ARC_ACCESS | CONST | ARC_NEG | ARC_TEMP, "access-const-neg-temp"),
        AccessConstFuzTemp = (ARC_ACCESS | CONST | ARC_FUZ | ARC_TEMP, "access-const-fuz-temp"),
        AccessVarPosPerm = (ARC_ACCESS | VAR | ARC_POS | ARC_PERM, "access-var-pos-perm"),
        AccessVarNegPerm = (ARC_ACCESS | VAR | ARC_NEG | ARC_PERM, "access-var-neg-perm"),
        AccessVarFuzPerm = (ARC_ACCESS | VAR | ARC_FUZ | ARC_PERM, "access-var-fuz-perm"),
        AccessVarPosTemp = (ARC_ACCESS | VAR | ARC_POS | ARC_TEMP, "access-var-pos-temp"),
        AccessVarNegTemp = (ARC_ACCESS | VAR | ARC_NEG | ARC_TEMP, "access-var-neg-temp"),
        AccessVarFuzTemp = (ARC_ACCESS | VAR | ARC_FUZ | ARC_TEMP, "access-var-fuz-temp"),
    }
}

// =============================================================================
// LINK TYPES
// =============================================================================

sc_type_enum! {
    /// Constancy of a link.
    pub enum LinkType {
        Link = (LINK, "link"),
        LinkConst = (LINK | CONST, "link-const"),
        LinkVar = (LINK | VAR, "link-var"),
    }
}

// =============================================================================
// TESTS
// =============================================================================

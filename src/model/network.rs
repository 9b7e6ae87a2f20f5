//! Network layers and scope kinds.

use serde::{Deserialize, Serialize};

/// One independent propagation layer. Layers share coordinates but never
/// share node state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    /// Inert slot reserved for a port that is not connected.
    Placeholder,
    Match,
    Scope,
    Term,
    Token,
}

impl NetworkType {
    pub const ALL: [NetworkType; 5] = [
        NetworkType::Placeholder,
        NetworkType::Match,
        NetworkType::Scope,
        NetworkType::Term,
        NetworkType::Token,
    ];

    pub fn code(self) -> &'static str {
        match self {
            NetworkType::Placeholder => "placeholder",
            NetworkType::Match => "match",
            NetworkType::Scope => "scope",
            NetworkType::Term => "term",
            NetworkType::Token => "token",
        }
    }

    pub fn from_code(code: &str) -> Option<NetworkType> {
        Self::ALL.into_iter().find(|network| network.code() == code)
    }

    pub(crate) fn flag(self) -> u32 {
        1 << self as u32
    }
}

impl std::fmt::Display for NetworkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Kind of lexical grouping a root hands to everything it reaches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    None,
    Function,
    Case,
    Forall,
    Matchin,
}

impl Scope {
    pub const ALL: [Scope; 5] = [
        Scope::None,
        Scope::Function,
        Scope::Case,
        Scope::Forall,
        Scope::Matchin,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Scope::None => "none",
            Scope::Function => "function",
            Scope::Case => "case",
            Scope::Forall => "forall",
            Scope::Matchin => "matchin",
        }
    }

    pub fn from_code(code: &str) -> Option<Scope> {
        Self::ALL.into_iter().find(|scope| scope.code() == code)
    }

    /// Three-bit encoding used in node keys.
    pub fn bits(self) -> u64 {
        self as u64
    }
}

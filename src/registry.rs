//! Namespace of generated declaration names.
//!
//! Every named host type gets exactly one Dart name per run. Names clash when two
//! identities share an unqualified tail; the later one is suffixed with a short
//! digest of its full identity so the result does not depend on run history
//! outside the input itself.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::naming::split_qualified;

const COLLISION_DIGEST_LEN: usize = 4;
const IMPORT_ALIAS_DIGEST_LEN: usize = 7;

/// Position of an anonymous type inside its enclosing named type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InlineContext<'a> {
    /// Generated name of the enclosing declaration.
    pub parent: &'a str,
    /// Field index within the parent.
    pub position: usize,
    /// Map branches taken inside the field's type: `K` for a key, `V` for a value.
    pub slot: &'a str,
}

impl<'a> InlineContext<'a> {
    /// Context of field `position` of `parent`.
    pub fn field(parent: &'a str, position: usize) -> Self {
        Self {
            parent,
            position,
            slot: "",
        }
    }

    /// Same field, one map branch deeper.
    pub fn branch<'b>(&self, slot: &'b str) -> InlineContext<'b>
    where
        'a: 'b,
    {
        InlineContext {
            parent: self.parent,
            position: self.position,
            slot,
        }
    }
}

#[derive(Debug, Default)]
pub struct NameRegistry {
    /// identity -> assigned name
    assigned: HashMap<String, String>,
    /// unqualified name -> identity that pre-reserved it
    prereserved: HashMap<String, String>,
    reserved: HashSet<String>,
}

impl NameRegistry {
    /// Creates a registry seeded with qualified names owned by existing code.
    pub fn new<I, S>(prereserved: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = Self::default();
        for qualified in prereserved {
            let qualified = qualified.as_ref();
            let (_, name) = split_qualified(qualified);
            out.prereserved
                .insert(name.to_string(), qualified.to_string());
        }
        out
    }

    /// Returns the generated name for `identity`, minting it on first use.
    ///
    /// An empty identity is an anonymous type; its name is derived from
    /// `context` alone and never enters the collision table.
    pub fn assign(&mut self, identity: &str, context: Option<InlineContext<'_>>) -> String {
        if identity.is_empty() {
            return match context {
                Some(ctx) => inline_name(ctx.parent, ctx.position, ctx.slot),
                None => inline_name("", 0, ""),
            };
        }

        if let Some(name) = self.assigned.get(identity) {
            return name.clone();
        }

        let (_, tail) = split_qualified(identity);
        let claimed_elsewhere = self
            .prereserved
            .get(tail)
            .is_some_and(|owner| owner != identity);

        // Inline-shaped tails are never handed out bare; anonymous types own that shape.
        let collides = claimed_elsewhere || self.reserved.contains(tail) || is_inline_shaped(tail);
        let name = if collides {
            let suffixed = format!("{tail}_{}", short_digest(identity, COLLISION_DIGEST_LEN));
            tracing::debug!(identity, name = %suffixed, "name collision; suffixed");
            suffixed
        } else {
            tail.to_string()
        };

        self.reserved.insert(name.clone());
        self.assigned.insert(identity.to_string(), name.clone());
        tracing::debug!(identity, name = %name, "assigned declaration name");
        name
    }

    /// Name previously assigned to `identity`, if any.
    pub fn get(&self, identity: &str) -> Option<&str> {
        self.assigned.get(identity).map(String::as_str)
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.contains(name)
    }
}

/// `<parent>Inline<NNN>` for an anonymous type at field `position`.
///
/// Map branches append `Key`/`Value`; trailing value branches are dropped, so a
/// plain map value keeps the bare field name.
pub fn inline_name(parent: &str, position: usize, slot: &str) -> String {
    let mut name = format!("{parent}Inline{position:03}");
    for branch in slot.trim_end_matches('V').chars() {
        name.push_str(if branch == 'K' { "Key" } else { "Value" });
    }
    name
}

fn is_inline_shaped(name: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Inline\d{3}(?:Key|Value)*$").expect("valid inline name regex"))
        .is_match(name)
}

/// Deterministic import alias for an external Dart path.
pub fn import_alias(path: &str) -> String {
    format!("external_{}", short_digest(path, IMPORT_ALIAS_DIGEST_LEN))
}

fn short_digest(text: &str, len: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let mut hex = hex::encode(hasher.finalize());
    hex.truncate(len);
    hex
}

//! Composable value constraints with encode/decode phasing.
//!
//! A constraint is a named predicate over one value type; a group is an
//! ordered collection applied left to right, stopping at the first
//! failure. Constraints can be registered process-wide under a keyword
//! and referenced from field metadata (`constraint:NAME`); a `^` prefix
//! on the name restricts the reference to the encode pass, `$` to the
//! decode pass.

pub mod temporal;

use core::fmt;
use std::any::{Any, TypeId, type_name};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;

use crate::error::{ConstraintViolation, Error, Result};

/// When a constraint runs relative to the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Only while encoding a value.
    Encode,
    /// Only while decoding a value.
    Decode,
    /// On both passes.
    #[default]
    Both,
}

impl Phase {
    pub fn runs_on(self, encoding: bool) -> bool {
        match self {
            Phase::Encode => encoding,
            Phase::Decode => !encoding,
            Phase::Both => true,
        }
    }
}

type CheckFn<T> = Arc<dyn Fn(&T) -> core::result::Result<(), ConstraintViolation> + Send + Sync>;

/// A named predicate over values of type `T`.
pub struct Constraint<T> {
    name: String,
    phase: Phase,
    check: CheckFn<T>,
}

impl<T> Clone for Constraint<T> {
    fn clone(&self) -> Self {
        Self { name: self.name.clone(), phase: self.phase, check: Arc::clone(&self.check) }
    }
}

impl<T> Constraint<T> {
    pub fn new(
        name: impl Into<String>,
        check: impl Fn(&T) -> core::result::Result<(), ConstraintViolation> + Send + Sync + 'static,
    ) -> Self {
        Self { name: name.into(), phase: Phase::Both, check: Arc::new(check) }
    }

    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn check(&self, value: &T) -> core::result::Result<(), ConstraintViolation> {
        (self.check)(value)
    }
}

impl<T> fmt::Debug for Constraint<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("name", &self.name)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

/// An ordered collection of constraints; the first failure short-circuits.
pub struct ConstraintGroup<T> {
    members: Vec<Constraint<T>>,
}

impl<T> Clone for ConstraintGroup<T> {
    fn clone(&self) -> Self {
        Self { members: self.members.clone() }
    }
}

impl<T> ConstraintGroup<T> {
    pub fn new() -> Self {
        Self { members: Vec::new() }
    }

    pub fn push(&mut self, constraint: Constraint<T>) {
        self.members.push(constraint);
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn check(&self, value: &T) -> core::result::Result<(), ConstraintViolation> {
        for member in &self.members {
            member.check(value)?;
        }
        Ok(())
    }

    /// Applies only the members whose phase covers the given pass.
    pub fn check_phase(&self, value: &T, encoding: bool) -> core::result::Result<(), ConstraintViolation> {
        for member in &self.members {
            if member.phase.runs_on(encoding) {
                member.check(value)?;
            }
        }
        Ok(())
    }
}

impl<T> Default for ConstraintGroup<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<Constraint<T>>> for ConstraintGroup<T> {
    fn from(members: Vec<Constraint<T>>) -> Self {
        Self { members }
    }
}

impl<T> fmt::Debug for ConstraintGroup<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.members.iter().map(Constraint::name)).finish()
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Types with a length notion, for [`size`] constraints.
pub trait Lengthy {
    fn size(&self) -> usize;
}

impl Lengthy for String {
    fn size(&self) -> usize {
        self.chars().count()
    }
}

impl Lengthy for Vec<u8> {
    fn size(&self) -> usize {
        self.len()
    }
}

/// SIZE (lo..hi) over types with a length.
pub fn size<T: Lengthy>(lo: usize, hi: usize) -> Constraint<T> {
    Constraint::new(format!("size({lo}..{hi})"), move |value: &T| {
        let n = value.size();
        if n < lo || n > hi {
            return Err(ConstraintViolation::new(format!("size {n} outside {lo}..{hi}")));
        }
        Ok(())
    })
}

/// Inclusive value range over ordered types.
pub fn range<T>(lo: T, hi: T) -> Constraint<T>
where
    T: PartialOrd + fmt::Display + Send + Sync + 'static,
{
    let label = format!("range({lo}..{hi})");
    Constraint::new(label, move |value: &T| {
        if *value < lo || *value > hi {
            return Err(ConstraintViolation::new(format!("value {value} outside {lo}..{hi}")));
        }
        Ok(())
    })
}

/// FROM (permitted alphabet) over string-like types.
pub fn from_alphabet<T: AsRef<str>>(alphabet: &str) -> Constraint<T> {
    let allowed: HashSet<char> = alphabet.chars().collect();
    Constraint::new("from-alphabet", move |value: &T| {
        for ch in value.as_ref().chars() {
            if !allowed.contains(&ch) {
                return Err(ConstraintViolation::new(format!(
                    "character {ch:?} outside the permitted alphabet"
                )));
            }
        }
        Ok(())
    })
}

/// Equality against an anchor string, optionally case-folded.
pub fn equality<T: AsRef<str>>(expected: impl Into<String>, case_sensitive: bool) -> Constraint<T> {
    let expected = expected.into();
    Constraint::new("equality", move |value: &T| {
        let got = value.as_ref();
        let equal = if case_sensitive {
            got == expected
        } else {
            got.eq_ignore_ascii_case(&expected)
        };
        if equal {
            Ok(())
        } else {
            Err(ConstraintViolation::new(format!("{got:?} does not equal {expected:?}")))
        }
    })
}

/// Prefix (ancestor) test over arc sequences such as object identifiers.
pub fn ancestor<T: AsRef<[u64]>>(prefix: Vec<u64>) -> Constraint<T> {
    Constraint::new("ancestor", move |value: &T| {
        let arcs = value.as_ref();
        if arcs.len() >= prefix.len() && arcs[..prefix.len()] == prefix[..] {
            Ok(())
        } else {
            Err(ConstraintViolation::new(format!(
                "{arcs:?} is not descended from {prefix:?}"
            )))
        }
    })
}

/// Membership in an allowed set of integers.
pub fn enumeration<T>(allowed: impl IntoIterator<Item = i128>) -> Constraint<T>
where
    T: Clone + Into<i128>,
{
    let allowed: Vec<i128> = allowed.into_iter().collect();
    Constraint::new("enumeration", move |value: &T| {
        let n: i128 = value.clone().into();
        if allowed.contains(&n) {
            Ok(())
        } else {
            Err(ConstraintViolation::new(format!("value {n} not in the enumeration")))
        }
    })
}

/// Passes when any member passes.
pub fn union<T: 'static>(members: Vec<Constraint<T>>) -> Constraint<T> {
    Constraint::new("union", move |value: &T| {
        let mut last = ConstraintViolation::new("empty union");
        for member in &members {
            match member.check(value) {
                Ok(()) => return Ok(()),
                Err(violation) => last = violation,
            }
        }
        Err(last)
    })
}

/// Passes when every member passes.
pub fn intersection<T: 'static>(members: Vec<Constraint<T>>) -> Constraint<T> {
    Constraint::new("intersection", move |value: &T| {
        for member in &members {
            member.check(value)?;
        }
        Ok(())
    })
}

/// An arbitrary named predicate.
pub fn property<T>(name: impl Into<String>, pred: impl Fn(&T) -> bool + Send + Sync + 'static) -> Constraint<T> {
    let name = name.into();
    let label = name.clone();
    Constraint::new(name, move |value: &T| {
        if pred(value) {
            Ok(())
        } else {
            Err(ConstraintViolation::new(format!("property {label:?} does not hold")))
        }
    })
}

// ---------------------------------------------------------------------------
// Process-wide registry
// ---------------------------------------------------------------------------

struct Registered {
    phase: Phase,
    value_type: TypeId,
    value_type_name: &'static str,
    check: Arc<dyn Fn(&dyn Any) -> Result<()> + Send + Sync>,
}

lazy_static! {
    static ref REGISTRY: RwLock<HashMap<String, Vec<Registered>>> = RwLock::new(HashMap::new());
}

fn erase<T: Any>(constraint: Constraint<T>) -> Registered {
    let phase = constraint.phase();
    Registered {
        phase,
        value_type: TypeId::of::<T>(),
        value_type_name: type_name::<T>(),
        check: Arc::new(move |any: &dyn Any| {
            let value = any.downcast_ref::<T>().ok_or(Error::TypeMismatch {
                expected: type_name::<T>(),
                got: "mismatched value type",
            })?;
            constraint.check(value).map_err(Error::from)
        }),
    }
}

/// Binds a constraint to a keyword usable from field metadata.
/// Registering the same keyword twice is an error.
pub fn register_constraint<T: Any>(keyword: &str, constraint: Constraint<T>) -> Result<()> {
    register_entries(keyword, vec![erase(constraint)])
}

/// Binds an ordered constraint group to a keyword.
pub fn register_constraint_group<T: Any>(keyword: &str, group: ConstraintGroup<T>) -> Result<()> {
    register_entries(keyword, group.members.into_iter().map(erase).collect())
}

/// [`register_constraint`] for module-init call sites that prefer a panic.
pub fn register_constraint_or_panic<T: Any>(keyword: &str, constraint: Constraint<T>) {
    if let Err(e) = register_constraint(keyword, constraint) {
        panic!("constraint registration failed: {e}");
    }
}

/// [`register_constraint_group`] for module-init call sites that prefer a panic.
pub fn register_constraint_group_or_panic<T: Any>(keyword: &str, group: ConstraintGroup<T>) {
    if let Err(e) = register_constraint_group(keyword, group) {
        panic!("constraint group registration failed: {e}");
    }
}

fn register_entries(keyword: &str, entries: Vec<Registered>) -> Result<()> {
    let key = keyword.to_ascii_lowercase();
    let mut registry = REGISTRY.write().expect("constraint registry poisoned");
    if registry.contains_key(&key) {
        return Err(Error::DuplicateRegistration(key));
    }
    registry.insert(key, entries);
    Ok(())
}

/// Applies the referenced constraints to a value for one pass.
///
/// Names may carry a `^` (encode-only) or `$` (decode-only) prefix; the
/// registered constraints' own phases are honored as well.
pub(crate) fn apply_registered(names: &[String], value: &dyn Any, encoding: bool) -> Result<()> {
    for name in names {
        let (key, field_phase) = match name.as_bytes().first() {
            Some(b'^') => (&name[1..], Phase::Encode),
            Some(b'$') => (&name[1..], Phase::Decode),
            _ => (name.as_str(), Phase::Both),
        };
        if !field_phase.runs_on(encoding) {
            continue;
        }
        let registry = REGISTRY.read().expect("constraint registry poisoned");
        let entries = registry
            .get(&key.to_ascii_lowercase())
            .ok_or_else(|| Error::UnknownConstraint(key.to_string()))?;
        for entry in entries {
            if !entry.phase.runs_on(encoding) {
                continue;
            }
            if entry.value_type != value.type_id() {
                return Err(Error::TypeMismatch {
                    expected: entry.value_type_name,
                    got: "mismatched value type",
                });
            }
            (entry.check)(value)?;
        }
    }
    Ok(())
}

//! The node-addressing algebra.
//!
//! A [`Loc`] names a single node inside the (potentially infinitely unrolled,
//! via loops and maps) execution tree of a graph. It is a sequence of
//! [`Step`]s rendered as a `.`-joined string, e.g. `-.N4.M0.E`.
//!
//! Two locations look empty but are not the same thing:
//!
//! - [`Loc::root`] (`"-"`) is the location of the top-level graph's exterior
//!   scope: one step, [`Step::Root`].
//! - [`Loc::empty`] (`""`) has no steps at all. It is reachable only by
//!   popping the root's own step, and exists solely as the parent of the
//!   root (`parent(root) == empty`, `parent(empty) == empty`).
//!
//! Every other location descends from the root by pushing [`Step::Node`],
//! [`Step::Loop`], [`Step::Map`] or [`Step::Exterior`] steps onto it.

use std::fmt;
use std::str::FromStr;

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::LocError;

/// A single step in a [`Loc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    /// The sentinel step that makes up [`Loc::root`]. Renders as `-`.
    Root,
    /// Descend into the `i`th node of the current graph. Renders as `N{i}`.
    Node(usize),
    /// Descend into loop iteration `i` of the current `Loop` node. Renders as `L{i}`.
    Loop(usize),
    /// Descend into map element `i` of the current `Map` node. Renders as `M{i}`.
    Map(usize),
    /// Descend into the exterior (boundary) scope of the current node. Renders as `E`.
    Exterior,
}

impl Step {
    fn index(self) -> Option<usize> {
        match self {
            Step::Node(i) | Step::Loop(i) | Step::Map(i) => Some(i),
            Step::Root | Step::Exterior => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Root => write!(f, "-"),
            Step::Node(i) => write!(f, "N{i}"),
            Step::Loop(i) => write!(f, "L{i}"),
            Step::Map(i) => write!(f, "M{i}"),
            Step::Exterior => write!(f, "E"),
        }
    }
}

impl FromStr for Step {
    type Err = LocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "-" {
            return Ok(Step::Root);
        }
        if s == "E" {
            return Ok(Step::Exterior);
        }
        let (tag, rest) = s.split_at(1);
        let idx: usize = rest
            .parse()
            .map_err(|_| LocError::BadStep(s.to_string()))?;
        match tag {
            "N" => Ok(Step::Node(idx)),
            "L" => Ok(Step::Loop(idx)),
            "M" => Ok(Step::Map(idx)),
            _ => Err(LocError::BadStep(s.to_string())),
        }
    }
}

/// The address of a single node within a graph's (possibly unrolled) execution tree.
///
/// `Loc` is cheap to clone and compare; it owns its steps rather than borrowing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Loc {
    steps: Vec<Step>,
}

impl Loc {
    /// The genuinely empty location (`""`). Only ever the parent of [`Loc::root`].
    pub fn empty() -> Self {
        Loc { steps: Vec::new() }
    }

    /// The root location (`"-"`), from which every other location descends.
    pub fn root() -> Self {
        Loc {
            steps: vec![Step::Root],
        }
    }

    /// The individual steps that make up this location, in order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    fn pushed(&self, step: Step) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);
        Loc { steps }
    }

    pub fn push_node(&self, idx: usize) -> Self {
        self.pushed(Step::Node(idx))
    }

    pub fn push_loop(&self, idx: usize) -> Self {
        self.pushed(Step::Loop(idx))
    }

    pub fn push_map(&self, idx: usize) -> Self {
        self.pushed(Step::Map(idx))
    }

    pub fn push_exterior(&self) -> Self {
        self.pushed(Step::Exterior)
    }

    /// The location one step up the tree. `parent(root) == empty`;
    /// `parent(empty) == empty`.
    pub fn parent(&self) -> Self {
        match self.steps.split_last() {
            Some((_, rest)) => Loc {
                steps: rest.to_vec(),
            },
            None => Loc::empty(),
        }
    }

    /// Remove and return the first step, plus the remaining location.
    ///
    /// `Root` is a persistent prefix, not an ordinary step: popping `-.N1.L0`
    /// yields `(N1, "-.L0")`, not `(Root, "N1.L0")` — the `-` stays on the
    /// remainder. Only when `Root` is the sole remaining step does popping it
    /// consume it, producing [`Loc::empty`].
    ///
    /// Errors on the empty location (nothing to pop).
    pub fn pop_first(&self) -> Result<(Step, Loc), LocError> {
        match self.steps.len() {
            0 => Err(LocError::PopEmpty),
            1 => Ok((self.steps[0], Loc::empty())),
            _ => {
                let mut rest = Vec::with_capacity(self.steps.len() - 1);
                rest.push(self.steps[0]);
                rest.extend_from_slice(&self.steps[2..]);
                Ok((self.steps[1], Loc { steps: rest }))
            }
        }
    }

    /// Remove and return the last step, plus the remaining location.
    ///
    /// Errors on the empty location (nothing to pop).
    pub fn pop_last(&self) -> Result<(Step, Loc), LocError> {
        match self.steps.split_last() {
            Some((last, rest)) => Ok((
                *last,
                Loc {
                    steps: rest.to_vec(),
                },
            )),
            None => Err(LocError::PopEmpty),
        }
    }

    /// Whether this location's last step is [`Step::Exterior`].
    pub fn last_step_exterior(&self) -> bool {
        matches!(self.steps.last(), Some(Step::Exterior))
    }

    /// The numeric index carried by the last non-exterior step (`N`/`L`/`M`).
    ///
    /// Errors if this location is empty, is the root, or ends in `Exterior`.
    pub fn peek_index(&self) -> Result<usize, LocError> {
        self.steps
            .last()
            .and_then(|s| s.index())
            .ok_or_else(|| LocError::NoIndexStep(self.to_string()))
    }

    /// All non-empty prefixes of this location, from shortest (`root`) to
    /// itself, inclusive. Used by debug-index bookkeeping to enumerate every
    /// ancestor scope of a location.
    pub fn partial_locs(&self) -> Vec<Loc> {
        (1..=self.steps.len())
            .map(|n| Loc {
                steps: self.steps[..n].to_vec(),
            })
            .collect()
    }

    /// Whether `self` is a (non-strict) prefix of `other`.
    pub fn is_prefix_of(&self, other: &Loc) -> bool {
        other.steps.len() >= self.steps.len() && other.steps[..self.steps.len()] == self.steps[..]
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.steps.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", rendered.join("."))
    }
}

impl FromStr for Loc {
    type Err = LocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Loc::empty());
        }
        let steps = s
            .split('.')
            .map(Step::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        if !matches!(steps.first(), Some(Step::Root)) {
            return Err(LocError::Malformed(s.to_string()));
        }
        Ok(Loc { steps })
    }
}

impl Serialize for Loc {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Loc {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Loc::from_str(&s).map_err(D::Error::custom)
    }
}

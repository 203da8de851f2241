//! Role tagging of sub-network parameters

use crate::graph::{Network, Param, TagSet};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Role a sub-network plays inside a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Shared feature extractor
    Phi,
    /// Target predictor
    Psi,
    /// Auxiliary context predictor
    Beta,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Phi, Role::Psi, Role::Beta];

    /// Tag attached to parameters owned by this role
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Phi => "phi",
            Role::Psi => "psi",
            Role::Beta => "beta",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable map from parameter identity to its full tag set (layer tags
/// plus role tags), fixed when the pattern is composed
#[derive(Debug, Default, Clone)]
pub struct ParamTags {
    entries: HashMap<Param, TagSet>,
}

impl ParamTags {
    /// Tag every parameter of each network with its role, in the given order.
    ///
    /// A parameter already tagged `phi` keeps that as its only role: later
    /// psi or beta passes skip it. The rule is one-sided, so a parameter
    /// shared between psi and beta carries both tags.
    pub(crate) fn build(networks: &[(Role, &dyn Network)]) -> Self {
        let mut entries: HashMap<Param, TagSet> = HashMap::new();

        for (role, network) in networks {
            for tagged in network.tagged_params() {
                let tags = entries.entry(tagged.param.clone()).or_default();
                tags.extend(tagged.tags);

                if *role != Role::Phi && tags.contains(Role::Phi.as_str()) {
                    debug!(
                        param = tagged.param.name(),
                        role = %role,
                        "parameter already owned by phi, not retagging"
                    );
                    continue;
                }
                tags.insert(role.as_str().to_string());
            }
        }

        Self { entries }
    }

    /// Full tag set of a parameter, if it belongs to the pattern
    pub fn get(&self, param: &Param) -> Option<&TagSet> {
        self.entries.get(param)
    }

    pub fn has_role(&self, param: &Param, role: Role) -> bool {
        self.get(param)
            .is_some_and(|tags| tags.contains(role.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

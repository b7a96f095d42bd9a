//! Debug-info metadata propagated between targets.
//!
//! The host walks the dependency graph; these records only know how to union
//! what a target produced directly with what its dependencies carry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// dSYM bundle locations of a target and everything it depends on.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct DsymBundleInfo {
    /// Bundles produced by this target
    pub direct_dsyms: BTreeSet<PathBuf>,
    /// Bundles produced by this target and its dependencies
    pub transitive_dsyms: BTreeSet<PathBuf>,
}

impl DsymBundleInfo {
    /// Combines this target's bundles with the dependencies' records.
    pub fn aggregate<'a>(
        direct: impl IntoIterator<Item = PathBuf>,
        deps: impl IntoIterator<Item = &'a DsymBundleInfo>,
    ) -> Self {
        let direct_dsyms: BTreeSet<PathBuf> = direct.into_iter().collect();
        let mut transitive_dsyms = direct_dsyms.clone();
        for dep in deps {
            transitive_dsyms.extend(dep.transitive_dsyms.iter().cloned());
        }
        Self {
            direct_dsyms,
            transitive_dsyms,
        }
    }
}

/// dSYM and linkmap files of a target and its dependencies.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct DebugOutputsInfo {
    /// dSYM files, or dSYM directories in the tree representation
    pub dsyms: BTreeSet<PathBuf>,
    /// Linkmap files
    pub linkmaps: BTreeSet<PathBuf>,
}

impl DebugOutputsInfo {
    /// Adds everything in `other` to `self`.
    pub fn merge(&mut self, other: &DebugOutputsInfo) {
        self.dsyms.extend(other.dsyms.iter().cloned());
        self.linkmaps.extend(other.linkmaps.iter().cloned());
    }

    /// Union of `direct` and all `deps`.
    pub fn union<'a>(
        direct: DebugOutputsInfo,
        deps: impl IntoIterator<Item = &'a DebugOutputsInfo>,
    ) -> Self {
        deps.into_iter().fold(direct, |mut acc, dep| {
            acc.merge(dep);
            acc
        })
    }

    /// True when neither set has entries.
    pub fn is_empty(&self) -> bool {
        self.dsyms.is_empty() && self.linkmaps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_shared_dependency_once() {
        let shared = DsymBundleInfo::aggregate([PathBuf::from("Shared.framework.dSYM")], []);
        let ext = DsymBundleInfo::aggregate([PathBuf::from("Ext.appex.dSYM")], [&shared]);
        let app = DsymBundleInfo::aggregate([PathBuf::from("App.app.dSYM")], [&ext, &shared]);

        assert_eq!(app.direct_dsyms.len(), 1);
        assert_eq!(app.transitive_dsyms.len(), 3);
        assert!(app.transitive_dsyms.contains(&PathBuf::from("Shared.framework.dSYM")));
    }

    #[test]
    fn test_debug_outputs_union() {
        let dep = DebugOutputsInfo {
            dsyms: [PathBuf::from("a")].into(),
            linkmaps: [PathBuf::from("a.linkmap")].into(),
        };
        let direct = DebugOutputsInfo {
            dsyms: [PathBuf::from("b")].into(),
            linkmaps: BTreeSet::new(),
        };
        let all = DebugOutputsInfo::union(direct, [&dep, &dep]);
        assert_eq!(all.dsyms.len(), 2);
        assert_eq!(all.linkmaps.len(), 1);
        assert!(!all.is_empty());
    }
}

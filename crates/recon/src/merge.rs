use std::collections::BTreeSet;

use crate::model::{CatalogEntity, Decision, Lookup};

/// Decide what to do with a candidate given what the catalog holds.
///
/// Pure: no remote calls. `FoundOne` merges into the existing record,
/// keeping its id and taking everything else from the candidate.
pub fn decide(candidate: CatalogEntity, lookup: Lookup) -> Decision {
    match lookup {
        Lookup::NotFound => Decision::Create(candidate),
        Lookup::FoundOne(existing) => {
            let supported_releases =
                union_releases(&existing.supported_releases, &candidate.supported_releases);
            Decision::Update {
                id: existing.id,
                entity: CatalogEntity {
                    id: existing.id,
                    supported_releases,
                    ..candidate
                },
            }
        }
        Lookup::FoundMany(matches) => Decision::Conflict {
            uid: candidate.uid,
            matches: matches.iter().map(|e| e.id).collect(),
        },
    }
}

pub fn union_releases(a: &BTreeSet<String>, b: &BTreeSet<String>) -> BTreeSet<String> {
    a.union(b).cloned().collect()
}

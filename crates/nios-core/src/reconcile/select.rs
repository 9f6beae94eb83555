// # Candidate Selection
//
// Narrows the records returned by a lookup down to the possible targets.
//
// ## Steps
//
// 1. Name: records carrying the lookup name; for a rename that finds
//    nothing, records already carrying the new name.
// 2. Exact fields: every `exact` field present in the desired state must
//    match. A record lacking the field is compared using the field default.
// 3. List fields, only while more than one record remains: any desired
//    element must match any record element. If several still remain,
//    records whose list equals the desired list are preferred.
//
// Whatever survives is returned; the reconciler decides what several
// survivors mean.

use tracing::debug;

use crate::model::{
    DesiredState, FieldSpec, Matching, RemoteRecord, any_element_matches, values_match,
};

/// Records the decision may apply to, after disambiguation
pub(crate) fn select_candidates<'a>(
    object_type: &str,
    spec: &FieldSpec,
    desired: &DesiredState,
    existing: &'a [RemoteRecord],
) -> Vec<&'a RemoteRecord> {
    let name = desired.name();

    let mut candidates = by_name(existing, name.lookup_name());
    if candidates.is_empty()
        && let Some(fallback) = name.fallback_name()
    {
        debug!(
            "No {} named '{}', trying renamed target '{}'",
            object_type,
            name.lookup_name(),
            fallback
        );
        candidates = by_name(existing, fallback);
    }

    for (field, attrs) in spec.fields_matching(Matching::Exact) {
        let Some(want) = desired.get(field) else {
            continue;
        };
        candidates.retain(|record| {
            record
                .get(field)
                .or(attrs.default.as_ref())
                .is_some_and(|have| values_match(want, have))
        });
    }

    if candidates.len() > 1 {
        candidates = narrow_by_lists(spec, desired, candidates);
    }

    candidates
}

fn by_name<'a>(existing: &'a [RemoteRecord], name: &str) -> Vec<&'a RemoteRecord> {
    existing
        .iter()
        .filter(|record| record.name() == Some(name))
        .collect()
}

fn narrow_by_lists<'a>(
    spec: &FieldSpec,
    desired: &DesiredState,
    mut candidates: Vec<&'a RemoteRecord>,
) -> Vec<&'a RemoteRecord> {
    let lists: Vec<_> = spec
        .fields_matching(Matching::AnyElement)
        .filter_map(|(field, _)| desired.get(field).map(|want| (field, want)))
        .collect();

    if lists.is_empty() {
        return candidates;
    }

    candidates.retain(|record| {
        lists.iter().all(|(field, want)| {
            record
                .get(field)
                .is_some_and(|have| any_element_matches(want, have))
        })
    });

    if candidates.len() > 1 {
        let exact: Vec<_> = candidates
            .iter()
            .copied()
            .filter(|record| {
                lists.iter().all(|(field, want)| {
                    record.get(field).is_some_and(|have| values_match(want, have))
                })
            })
            .collect();

        if !exact.is_empty() {
            candidates = exact;
        }
    }

    candidates
}

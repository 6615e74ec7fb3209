use std::collections::HashMap;

use super::types::{MethodChange, MethodSignature, SignatureKey};

/// Compare two signature lists and collect methods whose parameter count grew.
///
/// Each signature in `new` is matched against the old signatures sharing its
/// key:
///   - no old signature with that key: a newly added method, skipped
///   - an identical old signature exists: unchanged, skipped
///   - otherwise the first old candidate (old-list order) is compared, and a
///     change is reported only if the new list of parameters is longer
///
/// Shrinks, reorders and type-only edits are not reported.
pub fn diff_signatures(new: &[MethodSignature], old: &[MethodSignature]) -> Vec<MethodChange> {
    let previous = index_by_key(old);
    let mut changes = Vec::new();

    for signature in new {
        let Some(candidates) = previous.get(&signature.key()) else {
            continue;
        };
        if candidates.iter().any(|candidate| *candidate == signature) {
            continue;
        }

        // Overloads are not disambiguated further.
        let matched = candidates[0];
        if matched.parameters.len() < signature.parameters.len() {
            changes.push(MethodChange {
                old_signature: matched.clone(),
                new_signature: signature.clone(),
            });
        }
    }

    changes
}

fn index_by_key(signatures: &[MethodSignature]) -> HashMap<SignatureKey, Vec<&MethodSignature>> {
    let mut index: HashMap<SignatureKey, Vec<&MethodSignature>> =
        HashMap::with_capacity(signatures.len());
    for signature in signatures {
        index.entry(signature.key()).or_default().push(signature);
    }
    index
}

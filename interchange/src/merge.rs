//! Schema merging.
//!
//! [`merge`] folds a source schema into a destination schema in place.
//! Copied fields are shared, not cloned, so a field keeps its ordering
//! integer and lands among the destination's fields by that integer.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, trace};

use crate::model::{Fieldset, Schema};

/// Merges `source` into `dest`.
///
/// * Fields only in `source` are added to `dest`. With `overwrite`, fields
///   in both take the source definition and fields only in `dest` are
///   dropped, so the own field sets end up equal; without it, `dest` keeps
///   its own definitions.
/// * Tagged values, fieldsets (by name) and invariants of `source` are
///   copied; without `overwrite` an existing `dest` entry wins. Entries
///   only in `dest` are kept.
/// * With `sync_bases`, the bases of `dest` become the bases of `source`
///   when overwriting, and otherwise the union of both, source bases first.
pub fn merge(source: &Schema, dest: &mut Schema, overwrite: bool, sync_bases: bool) {
    debug!(
        "merging schema {:?} into {:?} (overwrite: {overwrite}, sync bases: {sync_bases})",
        source.name(),
        dest.name()
    );
    merge_fields(source, dest, overwrite);
    merge_tagged_values(source, dest, overwrite);
    merge_fieldsets(source, dest, overwrite);
    merge_invariants(source, dest, overwrite);
    if sync_bases {
        merge_bases(source, dest, overwrite);
    }
}

fn merge_fields(source: &Schema, dest: &mut Schema, overwrite: bool) {
    if overwrite {
        let stale: Vec<String> = dest
            .field_names()
            .into_iter()
            .filter(|name| source.get(name).is_none())
            .map(str::to_owned)
            .collect();
        for name in stale {
            trace!("dropping field {name:?} missing from the source");
            dest.remove_field(&name);
        }
    }
    for field in source.fields() {
        if overwrite || dest.get(field.name()).is_none() {
            trace!("taking field {:?} from the source", field.name());
            dest.put_field(Arc::clone(field));
        }
    }
}

fn merge_tagged_values(source: &Schema, dest: &mut Schema, overwrite: bool) {
    for (key, value) in source.tagged_values() {
        if overwrite || dest.tagged_value(key).is_none() {
            dest.set_tagged_value(key.clone(), value.clone());
        }
    }
}

fn merge_fieldsets(source: &Schema, dest: &mut Schema, overwrite: bool) {
    let fieldsets = dest.fieldsets_mut();
    for fieldset in source.fieldsets() {
        match fieldsets.iter_mut().find(|f| f.name == fieldset.name) {
            Some(existing) if overwrite => *existing = fieldset.clone(),
            Some(_) => {}
            None => fieldsets.push(fieldset.clone()),
        }
    }

    // Membership must still name own fields, each in one fieldset, with
    // source fieldsets claiming contested members first.
    let own: HashSet<String> = dest.field_names().into_iter().map(str::to_owned).collect();
    let from_source: HashSet<&str> = source.fieldsets().iter().map(|f| f.name.as_str()).collect();
    let mut fieldsets = std::mem::take(dest.fieldsets_mut());
    let mut claimed: HashSet<String> = HashSet::new();
    let (mut first, mut rest): (Vec<&mut Fieldset>, Vec<&mut Fieldset>) = fieldsets
        .iter_mut()
        .partition(|f| from_source.contains(f.name.as_str()));
    for fieldset in first.iter_mut().chain(rest.iter_mut()) {
        fieldset
            .fields
            .retain(|member| own.contains(member) && claimed.insert(member.clone()));
    }
    fieldsets.retain(|fieldset| {
        let keep = !fieldset.fields.is_empty();
        if !keep {
            trace!("dropping emptied fieldset {:?}", fieldset.name);
        }
        keep
    });
    *dest.fieldsets_mut() = fieldsets;
}

fn merge_invariants(source: &Schema, dest: &mut Schema, overwrite: bool) {
    if overwrite {
        *dest.invariants_mut() = source.invariants().to_vec();
    } else {
        for invariant in source.invariants() {
            dest.add_invariant(invariant.clone());
        }
    }
}

fn merge_bases(source: &Schema, dest: &mut Schema, overwrite: bool) {
    let mut bases: Vec<Arc<Schema>> = source.bases().to_vec();
    if !overwrite {
        for base in dest.bases() {
            if !bases.iter().any(|b| same_schema(b, base)) {
                bases.push(Arc::clone(base));
            }
        }
    }
    debug!(
        "bases of {:?} are now {:?}",
        dest.name(),
        bases.iter().map(|b| b.name()).collect::<Vec<_>>()
    );
    dest.set_bases(bases);
}

fn same_schema(a: &Arc<Schema>, b: &Arc<Schema>) -> bool {
    Arc::ptr_eq(a, b) || (!a.name().is_empty() && a.name() == b.name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Field, FieldBuilder, FieldType};
    use serde_json::json;

    fn line(name: &str) -> Field {
        FieldBuilder::new(FieldType::TEXT_LINE).name(name).build().unwrap()
    }

    fn pair() -> (Schema, Schema) {
        let mut source = Schema::new("pkg.Source");
        source.add_field(line("one")).unwrap();
        source.add_field(line("two")).unwrap();
        let mut dest = Schema::new("pkg.Dest");
        dest.add_field(line("one")).unwrap();
        dest.add_field(line("three")).unwrap();
        (source, dest)
    }

    #[test]
    fn new_fields_interleave_by_order() {
        let (source, mut dest) = pair();
        let kept = Arc::clone(dest.get("one").unwrap());
        merge(&source, &mut dest, false, false);
        assert_eq!(dest.field_names(), ["two", "one", "three"]);
        assert!(Arc::ptr_eq(dest.get("one").unwrap(), &kept));
        assert!(Arc::ptr_eq(dest.get("two").unwrap(), source.get("two").unwrap()));
    }

    #[test]
    fn overwrite_replaces_the_field_set() {
        let (source, mut dest) = pair();
        merge(&source, &mut dest, true, false);
        assert_eq!(dest.field_names(), ["one", "two"]);
        assert!(Arc::ptr_eq(dest.get("one").unwrap(), source.get("one").unwrap()));
    }

    #[test]
    fn tagged_values_follow_overwrite() {
        let (mut source, mut dest) = pair();
        source.set_tagged_value("shared", json!("source"));
        source.set_tagged_value("new", json!([1]));
        dest.set_tagged_value("shared", json!("dest"));
        dest.set_tagged_value("own", json!(true));

        let mut kept = dest.clone();
        merge(&source, &mut kept, false, false);
        assert_eq!(kept.tagged_value("shared"), Some(&json!("dest")));
        assert_eq!(kept.tagged_value("new"), Some(&json!([1])));
        assert_eq!(kept.tagged_value("own"), Some(&json!(true)));

        merge(&source, &mut dest, true, false);
        assert_eq!(dest.tagged_value("shared"), Some(&json!("source")));
        assert_eq!(dest.tagged_value("own"), Some(&json!(true)));
    }

    #[test]
    fn fieldsets_keep_members_valid() {
        let (mut source, mut dest) = pair();
        source.add_fieldset(Fieldset::new("main", ["one", "two"])).unwrap();
        dest.add_fieldset(Fieldset::new("main", ["three"])).unwrap();
        dest.add_fieldset(Fieldset::new("extra", ["one"])).unwrap();

        let mut kept = dest.clone();
        merge(&source, &mut kept, false, false);
        let names: Vec<&str> = kept.fieldsets().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["main", "extra"]);
        assert_eq!(kept.fieldsets()[0].fields, ["three"]);

        merge(&source, &mut dest, true, false);
        assert_eq!(dest.fieldsets().len(), 1);
        assert_eq!(dest.fieldsets()[0].fields, ["one", "two"]);
    }

    #[test]
    fn invariants_union_or_replace() {
        let (mut source, mut dest) = pair();
        source.add_invariant("pkg.a");
        dest.add_invariant("pkg.b");
        let mut kept = dest.clone();
        merge(&source, &mut kept, false, false);
        assert_eq!(kept.invariants(), ["pkg.b", "pkg.a"]);
        merge(&source, &mut dest, true, false);
        assert_eq!(dest.invariants(), ["pkg.a"]);
    }

    #[test]
    fn bases_are_left_alone_without_sync() {
        let (mut source, mut dest) = pair();
        source.add_base(Arc::new(Schema::new("pkg.Base")));
        merge(&source, &mut dest, true, false);
        assert!(dest.bases().is_empty());
    }
}

use tracing::{debug, warn};

use crate::avro::{split_fullname, Record, SchemaNode, SchemaRegistry, UnmergedTypes};
use crate::common::names::pascal;
use crate::converter::analysis::is_cycle_wrapper;
use crate::converter::merging::merge_avro_records;
use crate::converter::state::ResolutionContext;
use crate::converter::structs::create_wrapper_record;
use crate::converter::unions::make_union;

/// Merge a deferred record with each of its alternatives.
///
/// Record alternatives, referenced or inline, are merged with the base
/// fields. Anything else is kept as its own union member.
fn merge_variants(registry: &SchemaRegistry, base: &Record, unmerged: &UnmergedTypes) -> Vec<SchemaNode> {
    let mut base_record = base.clone();
    base_record.unmerged = None;

    let mut variants = Vec::with_capacity(unmerged.branches.len());
    for branch in &unmerged.branches {
        let resolved = match branch {
            SchemaNode::TypeRef(name) => match registry.get(name) {
                Some(found) => found,
                None => {
                    warn!("Alternative {name} of {} was never defined", base.fullname());
                    variants.push(branch.clone());
                    continue;
                }
            },
            inline => inline,
        };
        match resolved {
            SchemaNode::Record(r) if !is_cycle_wrapper(r) && r.unmerged.is_none() => {
                let name = match branch {
                    SchemaNode::TypeRef(_) => format!("{}{}", base.name, pascal(&r.name)),
                    _ => r.name.clone(),
                };
                variants.push(SchemaNode::Record(merge_avro_records(
                    &base_record,
                    r,
                    &name,
                    unmerged.intersect_required,
                )));
            }
            _ => variants.push(branch.clone()),
        }
    }

    if variants.is_empty() {
        variants.push(SchemaNode::Record(base_record));
    }
    variants
}

/// Replace every deferred record named `namespace.name` below `node`.
fn replace_unmerged(node: &mut SchemaNode, namespace: &str, name: &str, replacement: &SchemaNode) -> usize {
    if let SchemaNode::Record(r) = node {
        if r.name == name && r.namespace == namespace && r.unmerged.is_some() {
            *node = replacement.clone();
            return 1;
        }
    }
    match node {
        SchemaNode::Record(r) => r
            .fields
            .iter_mut()
            .map(|f| replace_unmerged(&mut f.field_type, namespace, name, replacement))
            .sum(),
        SchemaNode::Array(inner) | SchemaNode::Map(inner) => {
            replace_unmerged(inner, namespace, name, replacement)
        }
        SchemaNode::Union(members) => members
            .iter_mut()
            .map(|m| replace_unmerged(m, namespace, name, replacement))
            .sum(),
        _ => 0,
    }
}

/// Second pass over the registry: perform the `oneOf`/`anyOf` merges that
/// were deferred until every referenced type existed.
///
/// A top-level deferred record becomes a record of the same name with a
/// single `options` field holding the union of the merged variants; a
/// nested one is replaced by that union directly.
pub fn postprocess_schema(ctx: &mut ResolutionContext<'_>) {
    let pending = std::mem::take(&mut ctx.types_with_unmerged);
    for fullname in pending {
        let Some(SchemaNode::Record(record)) = ctx.registry.get(&fullname).cloned() else {
            continue;
        };
        let Some(unmerged) = record.unmerged.as_ref() else {
            continue;
        };
        let variants = merge_variants(&ctx.registry, &record, unmerged);
        debug!("Merged {} alternatives into {fullname}", variants.len());
        let union = make_union(variants);

        if ctx.registry.position(&fullname).is_some() {
            let mut wrapper = create_wrapper_record(
                &record.name,
                &record.namespace,
                "options",
                &record.dependencies,
                union,
            );
            wrapper.doc = record.doc.clone();
            ctx.registry.replace(&fullname, SchemaNode::Record(wrapper));
        } else {
            let (namespace, name) = split_fullname(&fullname);
            let replaced: usize = ctx
                .registry
                .types_mut()
                .iter_mut()
                .map(|t| replace_unmerged(t, namespace, name, &union))
                .sum();
            if replaced == 0 {
                warn!("Deferred type {fullname} disappeared before it could be merged");
            }
        }
    }
}

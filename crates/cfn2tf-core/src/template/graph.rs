//! Resource dependency graph.

use std::collections::{HashMap, HashSet, VecDeque};

use super::expr::{sub_parts, Expr, Intrinsic, SubPart};
use super::Template;

/// How one template element refers to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// `Ref` to a resource.
    Reference,
    /// `Fn::GetAtt` on a resource.
    Attribute,
    /// `Ref` to a parameter.
    Parameter,
    /// Explicit `DependsOn`.
    DependsOn,
}

/// A directed edge: `from` depends on `to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
    pub kind: DependencyKind,
}

impl Template {
    /// All dependency edges, in resource then property order, without duplicates.
    pub fn dependencies(&self) -> Vec<DependencyEdge> {
        let resources: HashSet<&str> = self.resources.iter().map(|r| r.logical_id.as_str()).collect();
        let parameters: HashSet<&str> = self.parameters.iter().map(|p| p.name.as_str()).collect();

        let mut edges = Vec::new();
        let mut seen = HashSet::new();
        for resource in &self.resources {
            let mut found = Vec::new();
            collect_expr_deps(&resource.properties, &resources, &parameters, &mut found);
            found.extend(
                resource
                    .depends_on
                    .iter()
                    .map(|d| (d.clone(), DependencyKind::DependsOn)),
            );
            for (to, kind) in found {
                let edge = DependencyEdge {
                    from: resource.logical_id.clone(),
                    to,
                    kind,
                };
                if seen.insert(edge.clone()) {
                    edges.push(edge);
                }
            }
        }
        edges
    }

    /// Edges leaving `logical_id`.
    pub fn dependencies_of(&self, logical_id: &str) -> Vec<DependencyEdge> {
        self.dependencies()
            .into_iter()
            .filter(|e| e.from == logical_id)
            .collect()
    }

    /// Resource ids ordered so that dependencies come first.
    ///
    /// Ties keep template order. Resources caught in a cycle are appended
    /// at the end in template order.
    pub fn resource_order(&self) -> Vec<String> {
        let ids: Vec<&str> = self.resources.iter().map(|r| r.logical_id.as_str()).collect();
        let mut in_degree: HashMap<&str, usize> = ids.iter().map(|id| (*id, 0)).collect();
        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();

        let mut counted = HashSet::new();
        for edge in self.dependencies() {
            if edge.kind == DependencyKind::Parameter || !in_degree.contains_key(edge.to.as_str()) {
                continue;
            }
            if !counted.insert((edge.from.clone(), edge.to.clone())) {
                continue;
            }
            if let Some(degree) = in_degree.get_mut(edge.from.as_str()) {
                *degree += 1;
            }
            dependents.entry(edge.to).or_default().push(edge.from);
        }

        let mut queue: VecDeque<&str> = ids.iter().copied().filter(|id| in_degree[id] == 0).collect();
        let mut order = Vec::with_capacity(ids.len());
        while let Some(id) = queue.pop_front() {
            order.push(id.to_string());
            let Some(next) = dependents.get(id) else {
                continue;
            };
            for dependent in next {
                if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        if let Some(id) = ids.iter().find(|i| **i == dependent.as_str()) {
                            queue.push_back(*id);
                        }
                    }
                }
            }
        }

        if order.len() < ids.len() {
            let placed: HashSet<String> = order.iter().cloned().collect();
            for id in ids {
                if !placed.contains(id) {
                    log::warn!("dependency cycle involving resource '{}'", id);
                    order.push(id.to_string());
                }
            }
        }
        order
    }
}

/// Collects the names an expression depends on.
fn collect_expr_deps(
    expr: &Expr,
    resources: &HashSet<&str>,
    parameters: &HashSet<&str>,
    deps: &mut Vec<(String, DependencyKind)>,
) {
    let named = |name: &str, kind: DependencyKind, deps: &mut Vec<(String, DependencyKind)>| {
        if resources.contains(name) {
            deps.push((name.to_string(), kind));
        } else if parameters.contains(name) {
            deps.push((name.to_string(), DependencyKind::Parameter));
        }
    };

    match expr {
        Expr::List(items) => {
            for item in items {
                collect_expr_deps(item, resources, parameters, deps);
            }
        }
        Expr::Object(entries) => {
            for (_, value) in entries {
                collect_expr_deps(value, resources, parameters, deps);
            }
        }
        Expr::Intrinsic(intrinsic) => match intrinsic {
            Intrinsic::Ref(name) => named(name, DependencyKind::Reference, deps),
            Intrinsic::GetAtt {
                logical_id,
                attribute,
            } => {
                named(logical_id, DependencyKind::Attribute, deps);
                collect_expr_deps(attribute, resources, parameters, deps);
            }
            Intrinsic::Sub {
                template,
                variables,
            } => {
                for part in sub_parts(template) {
                    let SubPart::Placeholder(name) = part else {
                        continue;
                    };
                    if variables.iter().any(|(v, _)| *v == name) {
                        continue;
                    }
                    match name.split_once('.') {
                        Some((id, _)) => named(id, DependencyKind::Attribute, deps),
                        None => named(&name, DependencyKind::Reference, deps),
                    }
                }
                for (_, value) in variables {
                    collect_expr_deps(value, resources, parameters, deps);
                }
            }
            Intrinsic::Join { items, .. } => collect_expr_deps(items, resources, parameters, deps),
            Intrinsic::Select { index, items } => {
                collect_expr_deps(index, resources, parameters, deps);
                collect_expr_deps(items, resources, parameters, deps);
            }
            Intrinsic::Split { source, .. } => collect_expr_deps(source, resources, parameters, deps),
            Intrinsic::Base64(inner) | Intrinsic::GetAZs(inner) | Intrinsic::ImportValue(inner) => {
                collect_expr_deps(inner, resources, parameters, deps)
            }
            Intrinsic::Cidr {
                ip_block,
                count,
                cidr_bits,
            } => {
                for e in [ip_block, count, cidr_bits] {
                    collect_expr_deps(e, resources, parameters, deps);
                }
            }
            Intrinsic::FindInMap {
                map_name,
                top_level_key,
                second_level_key,
            } => {
                for e in [map_name, top_level_key, second_level_key] {
                    collect_expr_deps(e, resources, parameters, deps);
                }
            }
            Intrinsic::Unsupported { .. } => {}
        },
        Expr::Null | Expr::Bool(_) | Expr::Number(_) | Expr::String(_) => {}
    }
}
